use std::fmt;

/// Settings or layout requests that cannot be honoured
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ConfigError {
    /// More special bricks requested than there are bricks to place them on
    TooManySpecialBricks { special: u32, total: u32 },
    NoBalls,
    TooManyBalls { count: u32, max: u32 },
    NoBricks,
    TooManyBricks { total: u32, max: u32 },
    InvalidElasticity(f32),
    InvalidGravity(f32),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManySpecialBricks { special, total } => write!(
                f,
                "too many special bricks: {special} requested, only {total} bricks"
            ),
            Self::NoBalls => write!(f, "ball count must be at least 1"),
            Self::TooManyBalls { count, max } => {
                write!(f, "too many balls: {count} requested, at most {max}")
            }
            Self::NoBricks => write!(f, "brick count must be at least 1"),
            Self::TooManyBricks { total, max } => {
                write!(f, "too many bricks: {total} requested, at most {max}")
            }
            Self::InvalidElasticity(e) => {
                write!(f, "elasticity must be a finite value >= 0, got {e}")
            }
            Self::InvalidGravity(g) => write!(f, "gravity must be a finite value >= 0, got {g}"),
        }
    }
}

impl std::error::Error for ConfigError {}
