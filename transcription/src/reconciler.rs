//! Merges overlapping segment hypotheses into one ordered, non-overlapping sequence.
//!
//! Segments of a kind are swept in `start_ms` order (ties: longer first, then more
//! confident, then label alphabetically). When two spans overlap the more confident
//! one keeps the contested time. The loser is dropped when it lies wholly inside the
//! winner; otherwise it keeps whatever sticks out. A loser that starts before the
//! winner keeps its head, and any part extending past the winner is re-queued with
//! its start moved to the winner's end. Equal confidence keeps the segment that was
//! swept first, so equally confident conflicting labels over the same range resolve
//! to the alphabetically first label regardless of provider order.

use std::cmp::Ordering;

use log::*;

use crate::error::Error;
use crate::types::raw::RawResult;
use crate::types::segment::{Segment, SegmentKind};

/// Reconciled sequences for every segment kind of one result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconciledSegments {
    pub language: Vec<Segment>,
    pub speaker: Vec<Segment>,
    pub chapters: Vec<Segment>,
}

/// Reconcile every segment kind found in a raw result.
pub fn reconcile_result(raw: &RawResult) -> Result<ReconciledSegments, Error> {
    let reconciled = ReconciledSegments {
        language: reconcile(
            SegmentKind::Language,
            raw.segments(SegmentKind::Language).cloned(),
        )?,
        speaker: reconcile(
            SegmentKind::Speaker,
            raw.segments(SegmentKind::Speaker).cloned(),
        )?,
        chapters: reconcile(
            SegmentKind::Chapter,
            raw.segments(SegmentKind::Chapter).cloned(),
        )?,
    };

    debug!(
        "Reconciled segments: {} language, {} speaker, {} chapters",
        reconciled.language.len(),
        reconciled.speaker.len(),
        reconciled.chapters.len()
    );

    Ok(reconciled)
}

/// Reconcile one kind of segments.
///
/// Segments that violate the provider contract (negative or empty spans, a
/// confidence outside [0, 1], the wrong kind) are reported as
/// `ErrorKind::InternalReconciliation` with the offending segment as context.
pub fn reconcile(
    kind: SegmentKind,
    segments: impl IntoIterator<Item = Segment>,
) -> Result<Vec<Segment>, Error> {
    let mut pending: Vec<Segment> = segments.into_iter().collect();
    for segment in &pending {
        validate(kind, segment)?;
    }

    // Reverse sweep order so `pop` yields the next segment to visit.
    pending.sort_by(|a, b| sweep_order(b, a));

    let mut merged: Vec<Segment> = Vec::with_capacity(pending.len());
    while let Some(mut next) = pending.pop() {
        let Some(current) = merged.last_mut() else {
            merged.push(next);
            continue;
        };

        if next.start_ms >= current.end_ms {
            merged.push(next);
            continue;
        }

        if current.confidence >= next.confidence {
            if next.end_ms <= current.end_ms {
                trace!(
                    "Dropping contained {:?} segment '{}' [{}, {})",
                    kind,
                    next.label,
                    next.start_ms,
                    next.end_ms
                );
                continue;
            }
            next.start_ms = current.end_ms;
            requeue(&mut pending, next);
        } else {
            if current.end_ms > next.end_ms {
                let mut tail = current.clone();
                tail.start_ms = next.end_ms;
                requeue(&mut pending, tail);
            }
            if current.start_ms < next.start_ms {
                current.end_ms = next.start_ms;
            } else {
                merged.pop();
            }
            merged.push(next);
        }
    }

    verify_disjoint(kind, &merged)?;
    Ok(merged)
}

fn sweep_order(a: &Segment, b: &Segment) -> Ordering {
    a.start_ms
        .cmp(&b.start_ms)
        .then_with(|| b.duration_ms().cmp(&a.duration_ms()))
        .then_with(|| b.confidence.total_cmp(&a.confidence))
        .then_with(|| a.label.cmp(&b.label))
        .then_with(|| a.text.cmp(&b.text))
}

fn requeue(pending: &mut Vec<Segment>, segment: Segment) {
    let index = pending.partition_point(|p| sweep_order(p, &segment) == Ordering::Greater);
    pending.insert(index, segment);
}

fn validate(kind: SegmentKind, segment: &Segment) -> Result<(), Error> {
    let problem = if segment.kind != kind {
        Some("segment kind does not match its sequence")
    } else if segment.start_ms < 0 {
        Some("segment starts before zero")
    } else if segment.start_ms >= segment.end_ms {
        Some("segment does not end after it starts")
    } else if !(0.0..=1.0).contains(&segment.confidence) {
        Some("segment confidence is outside [0, 1]")
    } else {
        None
    };

    match problem {
        Some(message) => {
            warn!("Invalid {:?} segment from provider: {}", kind, message);
            Err(Error::reconciliation(message, context(segment)))
        }
        None => Ok(()),
    }
}

fn verify_disjoint(kind: SegmentKind, merged: &[Segment]) -> Result<(), Error> {
    match merged.windows(2).find(|pair| pair[0].end_ms > pair[1].start_ms) {
        Some(pair) => {
            error!("Reconciled {:?} segments still overlap", kind);
            Err(Error::reconciliation(
                "reconciled segments overlap",
                format!("{} / {}", context(&pair[0]), context(&pair[1])),
            ))
        }
        None => Ok(()),
    }
}

fn context(segment: &Segment) -> String {
    serde_json::to_string(segment).unwrap_or_else(|_| format!("{:?}", segment))
}
