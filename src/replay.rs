//! Offline replay: base trades with their history snapshot and the bars
//! that follow, run through a [`GridController`] per session.

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::config::Config;
use crate::models::{BaseTrade, Candle, MarketSnapshot};
use crate::strategies::GridModel;
use crate::trading::{BarUpdate, GridController, OrderTicket};

#[derive(Debug, Clone, Deserialize)]
pub struct ReplayDocument {
    pub sessions: Vec<ReplaySession>,
}

impl ReplayDocument {
    pub fn from_json_str(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplaySession {
    pub base: BaseTrade,
    #[serde(default)]
    pub snapshot: MarketSnapshot,
    /// Skips regime selection when set
    #[serde(default)]
    pub model: Option<GridModel>,
    #[serde(default)]
    pub bars: Vec<Candle>,
}

/// One line of replay output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplayLine {
    Ticket {
        session: usize,
        #[serde(flatten)]
        ticket: OrderTicket,
    },
    Skipped {
        session: usize,
        grid_id: String,
        slot: String,
        reason: String,
    },
    Bar {
        session: usize,
        #[serde(flatten)]
        update: BarUpdate,
    },
    Error {
        session: usize,
        error: String,
    },
}

/// Run one session to completion. Errors end the session and are reported
/// as a final [`ReplayLine::Error`].
pub fn run_session(config: &Config, session_idx: usize, session: ReplaySession) -> Vec<ReplayLine> {
    let mut controller = GridController::new(config);
    let mut lines = Vec::new();
    let symbol = session.base.symbol.clone();

    let created = match session.model {
        Some(model) => controller.create_grid_with_model(session.base, session.snapshot, model),
        None => controller.create_new_grid(session.base, session.snapshot),
    };
    let creation = match created {
        Ok(c) => c,
        Err(e) => {
            warn!(session = session_idx, error = %e, "Grid creation failed");
            lines.push(ReplayLine::Error {
                session: session_idx,
                error: e.to_string(),
            });
            return lines;
        }
    };
    lines.extend(creation.orders.into_iter().map(|ticket| ReplayLine::Ticket {
        session: session_idx,
        ticket,
    }));
    lines.extend(creation.skipped.into_iter().map(|s| ReplayLine::Skipped {
        session: session_idx,
        grid_id: creation.grid_id.clone(),
        slot: s.slot.to_string(),
        reason: s.reason.to_string(),
    }));

    for bar in &session.bars {
        let updates = match controller.advance_bar(&symbol, bar, None) {
            Ok(u) => u,
            Err(e) => {
                lines.push(ReplayLine::Error {
                    session: session_idx,
                    error: e.to_string(),
                });
                return lines;
            }
        };
        for update in updates {
            let replacement = update.replacement.clone();
            lines.push(ReplayLine::Bar {
                session: session_idx,
                update,
            });
            if let Some(grid) = replacement.as_deref().and_then(|id| controller.grid(id)) {
                lines.extend(grid.tickets().into_iter().map(|ticket| ReplayLine::Ticket {
                    session: session_idx,
                    ticket,
                }));
            }
        }
    }
    lines
}

/// Run every session on its own blocking task. Output is grouped by
/// session in document order.
pub async fn run_replay(config: Config, doc: ReplayDocument) -> anyhow::Result<Vec<ReplayLine>> {
    let total = doc.sessions.len();
    let mut tasks = JoinSet::new();
    for (idx, session) in doc.sessions.into_iter().enumerate() {
        let config = config.clone();
        tasks.spawn_blocking(move || (idx, run_session(&config, idx, session)));
    }

    let mut results: Vec<Option<Vec<ReplayLine>>> = vec![None; total];
    while let Some(joined) = tasks.join_next().await {
        let (idx, lines) = joined?;
        results[idx] = Some(lines);
    }
    info!(sessions = total, "Replay finished");
    Ok(results.into_iter().flatten().flatten().collect())
}
