//! A3S Imagetools CLI - assemble and publish multi-platform manifest lists.

pub mod commands;
