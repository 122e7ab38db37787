mod xinference_scoring;
pub use xinference_scoring::*;
