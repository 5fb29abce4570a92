pub mod error;
pub mod geometry;
pub mod hull;
pub mod classify;
pub mod diagnostics;
pub mod resolve;
pub mod homography;
pub mod record;
pub mod annotation;
pub mod mapper;
pub mod config;
pub mod rectify;

pub use error::{Error, Result};
