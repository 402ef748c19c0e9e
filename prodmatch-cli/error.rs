use prodmatch_core::MatchError;

/// Faults at the pipeline boundary: bad configuration, unreadable inputs.
#[derive(Debug)]
pub enum PipelineError {
    Match(MatchError),
    Image(image::ImageError),
    Io(std::io::Error),
    /// A run or pipeline file that could not be parsed
    Config(String),
    /// A path in a run file that resolves outside the allowed directory
    PathEscape(std::path::PathBuf),
    ThreadPool(rayon::ThreadPoolBuildError),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Match(e) => write!(f, "{}", e),
            PipelineError::Image(e) => write!(f, "Image error: {}", e),
            PipelineError::Io(e) => write!(f, "I/O error: {}", e),
            PipelineError::Config(msg) => write!(f, "Configuration error: {}", msg),
            PipelineError::PathEscape(p) => {
                write!(f, "Path {} escapes the run directory", p.display())
            }
            PipelineError::ThreadPool(e) => write!(f, "Thread pool error: {}", e),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Match(e) => Some(e),
            PipelineError::Image(e) => Some(e),
            PipelineError::Io(e) => Some(e),
            PipelineError::ThreadPool(e) => Some(e),
            PipelineError::Config(_) | PipelineError::PathEscape(_) => None,
        }
    }
}

impl From<MatchError> for PipelineError {
    fn from(err: MatchError) -> Self {
        PipelineError::Match(err)
    }
}

impl From<image::ImageError> for PipelineError {
    fn from(err: image::ImageError) -> Self {
        PipelineError::Image(err)
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Io(err)
    }
}

impl From<rayon::ThreadPoolBuildError> for PipelineError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        PipelineError::ThreadPool(err)
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
