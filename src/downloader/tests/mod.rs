use super::test_helpers::*;
use super::*;
use crate::types::{DownloadStats, RunStatus};
use std::sync::Arc;
use std::time::Duration;
use wiremock::MockServer;
