//! Askama view models for the web pages.

use askama::Template;
use fedithread_core::{InstanceMetadata, Status, ThreadContext};

use super::og::OgMeta;

/// A status with its conversation.
#[derive(Template)]
#[template(path = "thread.html")]
pub struct ThreadView<'a> {
    pub instance: &'a InstanceMetadata,
    pub status: &'a Status,
    pub context: &'a ThreadContext,
    pub og: &'a OgMeta,
    pub stylesheets: &'a [String],
    pub javascript: &'a [String],
}

/// Failure page; shares the layout of every other page.
#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorView<'a> {
    pub instance: &'a InstanceMetadata,
    pub code: u16,
    pub reason: &'a str,
    pub message: &'a str,
    pub request_id: &'a str,
    pub stylesheets: &'a [String],
}
