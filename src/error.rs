use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeblurError {
    #[error("invalid grid dimensions: {rows}x{cols}")]
    InvalidDimensions { rows: usize, cols: usize },

    #[error("shape mismatch in {context}: {lhs_rows}x{lhs_cols} vs {rhs_rows}x{rhs_cols}")]
    ShapeMismatch {
        context: &'static str,
        lhs_rows: usize,
        lhs_cols: usize,
        rhs_rows: usize,
        rhs_cols: usize,
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("singular system: {n}x{n} normal equations could not be solved")]
    SingularSystem { n: usize },
}

pub type Result<T> = std::result::Result<T, DeblurError>;
