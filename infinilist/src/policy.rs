// Copyright (c) 2024-2025 Infinilist Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Continuation policy: does another page exist, and which cursor fetches it
//!
//! Backends fill `hasNext` and `total` inconsistently, so the decision walks an
//! ordered list of named rules against the most recently fetched page and takes
//! the first rule that produces a decision:
//!
//! 1. `explicit_end`   - `hasNext == false`                    => done
//! 2. `empty_page`     - latest page has no rows                => done
//! 3. `explicit_more`  - `hasNext == true`                     => next
//! 4. `short_page`     - fewer rows than the page size hint     => done
//! 5. `total_reached`  - rows fetched so far >= latest `total`  => done
//! 6. `fallback`       - otherwise                              => next
//!
//! The next cursor is always `cursors.len() + 1`, so repeated evaluation before a
//! new page lands returns the same answer.

use crate::query::{Cursor, PageEnvelope};

/// Outcome of the continuation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    Next(Cursor),
    Done,
}

impl Continuation {
    pub fn has_more(&self) -> bool {
        matches!(self, Continuation::Next(_))
    }

    pub fn cursor(&self) -> Option<Cursor> {
        match self {
            Continuation::Next(cursor) => Some(*cursor),
            Continuation::Done => None,
        }
    }
}

/// Signals the rules read, extracted once from the accumulated pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSignals {
    pub latest_rows: usize,
    pub latest_total: Option<u64>,
    pub latest_has_next: Option<bool>,
    pub rows_fetched: u64,
    pub pages_fetched: usize,
    pub page_size_hint: Option<usize>,
}

impl PageSignals {
    /// Returns `None` when no page has been fetched yet
    pub fn collect<T>(
        pages: &[PageEnvelope<T>],
        cursors: &[Cursor],
        page_size_hint: Option<usize>,
    ) -> Option<Self> {
        let latest = pages.last()?;
        Some(Self {
            latest_rows: latest.rows.len(),
            latest_total: latest.total,
            latest_has_next: latest.has_next,
            rows_fetched: pages.iter().map(|page| page.rows.len() as u64).sum(),
            pages_fetched: cursors.len(),
            page_size_hint,
        })
    }

    fn next_cursor(&self) -> Continuation {
        Continuation::Next(Cursor::after(self.pages_fetched))
    }
}

/// A named predicate => decision rule
pub struct ContinuationRule {
    pub name: &'static str,
    evaluate: fn(&PageSignals) -> Option<Continuation>,
}

impl ContinuationRule {
    pub fn evaluate(&self, signals: &PageSignals) -> Option<Continuation> {
        (self.evaluate)(signals)
    }
}

impl std::fmt::Debug for ContinuationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContinuationRule")
            .field("name", &self.name)
            .finish()
    }
}

/// Rules in priority order; the last one always decides
pub const RULES: &[ContinuationRule] = &[
    ContinuationRule {
        name: "explicit_end",
        evaluate: |s| (s.latest_has_next == Some(false)).then_some(Continuation::Done),
    },
    ContinuationRule {
        name: "empty_page",
        evaluate: |s| (s.latest_rows == 0).then_some(Continuation::Done),
    },
    ContinuationRule {
        name: "explicit_more",
        evaluate: |s| (s.latest_has_next == Some(true)).then(|| s.next_cursor()),
    },
    ContinuationRule {
        name: "short_page",
        evaluate: |s| match s.page_size_hint {
            Some(hint) if s.latest_rows < hint => Some(Continuation::Done),
            _ => None,
        },
    },
    ContinuationRule {
        name: "total_reached",
        evaluate: |s| match s.latest_total {
            Some(total) if s.rows_fetched >= total => Some(Continuation::Done),
            _ => None,
        },
    },
    ContinuationRule {
        name: "fallback",
        evaluate: |s| Some(s.next_cursor()),
    },
];

/// Decide the next step and report which rule decided it
pub fn decide_with_rule(signals: &PageSignals) -> (Continuation, &'static str) {
    for rule in RULES {
        if let Some(decision) = rule.evaluate(signals) {
            return (decision, rule.name);
        }
    }
    (signals.next_cursor(), "fallback")
}

/// Decide whether another page should be fetched and with which cursor.
///
/// With no pages the initial cursor is `1`; the controller supplies it directly
/// and normally never asks.
pub fn decide_next<T>(
    pages: &[PageEnvelope<T>],
    cursors: &[Cursor],
    page_size_hint: Option<usize>,
) -> Continuation {
    let Some(signals) = PageSignals::collect(pages, cursors, page_size_hint) else {
        return Continuation::Next(Cursor::FIRST);
    };

    let (decision, rule) = decide_with_rule(&signals);
    match decision {
        Continuation::Next(cursor) if cursors.contains(&cursor) => {
            log::warn!(
                "Continuation rule '{}' proposed already-fetched cursor {}; treating list as exhausted",
                rule,
                cursor
            );
            Continuation::Done
        }
        decision => decision,
    }
}
