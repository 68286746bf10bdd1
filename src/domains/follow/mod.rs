//! Follow domain - graph crawling and follow fan-out.
//!
//! Job flow:
//!
//! ```text
//! SearchJob          ─► search posts        ─► FollowJob per new author
//!                                           ─► ListConnectionsJob (refresh)
//!                                           ─► SearchJob (older page, if any)
//!                                           ─► SearchJob (watermark | idle poll)
//! ListConnectionsJob ─► merge connections   ─► ListConnectionsJob (next cursor) | end
//! FollowJob          ─► follow target       ─► end
//! ```

pub mod effects;
pub mod jobs;
pub mod models;
