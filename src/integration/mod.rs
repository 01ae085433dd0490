//! Integration tests
//!
//! Drive the whole planning and export pipeline over synthetic catalogs with
//! a fake clip tool standing in for ffmpeg.

mod fixtures;
mod scenarios;
