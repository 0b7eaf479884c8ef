//! Multi-frame consensus.
//!
//! A running intersection of per-frame rectangles. A step that would shrink
//! the box below the collapse floor is skipped, so one outlier frame cannot
//! destroy an otherwise stable result.

use serde::Serialize;
use tracing::debug;
use vcrop_models::Rectangle;

/// Intersect `acc` with `next`, keeping `acc` if the result collapses.
///
/// Returns the new box and whether `next` was accepted.
pub fn intersect_step(acc: &Rectangle, next: &Rectangle, floor: u32) -> (Rectangle, bool) {
    match acc.intersection(next) {
        Some(rect) if rect.width >= floor && rect.height >= floor => (rect, true),
        _ => (*acc, false),
    }
}

/// Reconciled rectangle over all sampled frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConsensusBox {
    pub rect: Rectangle,
    /// Frames that narrowed (or kept) the box
    pub contributors: usize,
    /// Frames skipped because they would have collapsed the box
    pub rejected: usize,
}

/// Running-intersection accumulator.
#[derive(Debug, Clone)]
pub struct Consensus {
    floor: u32,
    state: Option<ConsensusBox>,
}

impl Consensus {
    pub fn new(collapse_floor: u32) -> Self {
        Self {
            floor: collapse_floor.max(1),
            state: None,
        }
    }

    /// Fold one per-frame rectangle into the consensus.
    pub fn push(&mut self, rect: Rectangle) {
        self.state = Some(match self.state {
            None => ConsensusBox {
                rect,
                contributors: 1,
                rejected: 0,
            },
            Some(current) => {
                let (next, accepted) = intersect_step(&current.rect, &rect, self.floor);
                if !accepted {
                    debug!(
                        current = %current.rect,
                        outlier = %rect,
                        "Skipping frame that would collapse the consensus"
                    );
                }
                ConsensusBox {
                    rect: next,
                    contributors: current.contributors + accepted as usize,
                    rejected: current.rejected + (!accepted) as usize,
                }
            }
        });
    }

    /// Final box, `None` if nothing was pushed.
    pub fn finish(self) -> Option<ConsensusBox> {
        self.state
    }
}

/// Reduce a sequence of rectangles to their consensus.
pub fn consensus<'a>(
    rects: impl IntoIterator<Item = &'a Rectangle>,
    collapse_floor: u32,
) -> Option<ConsensusBox> {
    let mut acc = Consensus::new(collapse_floor);
    for rect in rects {
        acc.push(*rect);
    }
    acc.finish()
}
