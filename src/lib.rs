// This is free and unencumbered software released into the public domain.

//! Camera session lifecycle management: enumerate devices, open one, bind
//! preview/still/recording output targets, and move safely between preview,
//! still capture, and recording.
//!
//! The [`shared::SessionManager`] sits above the [`shared::CameraPlatform`]
//! seam; [`shared::backends::sim`] provides a software platform for tests
//! and demos.

pub mod cli;
pub mod shared;
