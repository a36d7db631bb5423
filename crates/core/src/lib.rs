//! Face detection, annotation and cropping pipeline.
//!
//! The crate is layered leaf-first: [`shared`] holds the image value and
//! rectangle maths, [`codec`] moves images in and out of transport strings,
//! [`detection`], [`annotation`] and [`cropping`] implement the per-image
//! stages, [`pipeline`] sequences them into calls, and [`governor`] bounds
//! how many calls run at once.

pub mod annotation;
pub mod codec;
pub mod config;
pub mod cropping;
pub mod detection;
pub mod governor;
pub mod pipeline;
pub mod shared;
