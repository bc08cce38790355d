//! Segment boundaries and the overlay decision

use crate::error::{Error, Result};

/// Which segment boundary is being recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Last page of the cover segment
    CoverEnd,
    /// First page of the end segment
    BodyEnd,
}

/// Decide whether `page` lies strictly inside the body segment.
///
/// `body_end` is `None` while the body is still being rendered, which
/// leaves the upper side unbounded. An empty body (`cover_end + 1 ==
/// body_end`) never qualifies, and neither boundary page does.
pub fn should_overlay(page: u32, cover_end: u32, body_end: Option<u32>) -> bool {
    cover_end < page && body_end.map_or(true, |end| page < end)
}

/// Page numbers where the segments of one assembly meet.
///
/// Each marker is written once. Nothing overlays until the cover has been
/// closed off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Boundaries {
    cover_end: Option<u32>,
    body_end: Option<u32>,
}

impl Boundaries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last cover page, once marked
    pub fn cover_end(&self) -> Option<u32> {
        self.cover_end
    }

    /// First end-segment page, once marked
    pub fn body_end(&self) -> Option<u32> {
        self.body_end
    }

    pub fn should_overlay(&self, page: u32) -> bool {
        match self.cover_end {
            Some(cover_end) => should_overlay(page, cover_end, self.body_end),
            None => false,
        }
    }

    /// Record `page` for `kind`.
    pub fn mark(&mut self, kind: Boundary, page: u32) -> Result<()> {
        match kind {
            Boundary::CoverEnd => {
                if self.cover_end.is_some() {
                    return Err(boundary_error(kind, "already marked"));
                }
                self.cover_end = Some(page);
            }
            Boundary::BodyEnd => {
                if self.body_end.is_some() {
                    return Err(boundary_error(kind, "already marked"));
                }
                let cover_end = self
                    .cover_end
                    .ok_or_else(|| boundary_error(kind, "cover end not marked yet"))?;
                if page <= cover_end {
                    return Err(boundary_error(
                        kind,
                        &format!("page {} is not after cover end {}", page, cover_end),
                    ));
                }
                self.body_end = Some(page);
            }
        }
        Ok(())
    }
}

fn boundary_error(kind: Boundary, reason: &str) -> Error {
    Error::Boundary {
        kind,
        reason: reason.to_string(),
    }
}
