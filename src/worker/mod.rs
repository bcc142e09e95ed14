//! Background workers that turn queue requests into thumbnails

pub mod pool;
