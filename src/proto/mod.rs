//! Protocol Buffer definitions and generated code for the watch service.
//!
//! `generated/` is produced by tonic-build from
//! `proto/resource_watch.proto` and checked in; `watch_ext` adds the
//! conversions into the crate's own event types.

pub mod watch {
    include!("generated/sentinel.watch.rs");
}

mod watch_ext;
