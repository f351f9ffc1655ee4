//! Companion surface the control plane exposes on behalf of the hosting
//! terminal: screen snapshot, queued keystrokes, tab list and layout state.
//!
//! The hosting terminal drives this bridge (feeding output, draining
//! input); the RPC and HTTP surfaces only read and enqueue.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

const DEFAULT_COLS: u16 = 80;
const DEFAULT_ROWS: u16 = 24;
const SCROLLBACK_LINES: usize = 10_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabInfo {
    pub index: usize,
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPane {
    Terminal,
    Editor,
}

impl FocusedPane {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            FocusedPane::Terminal => "terminal",
            FocusedPane::Editor => "editor",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutState {
    pub focused: String,
    pub split_ratio: f32,
}

#[derive(Debug)]
struct BridgeInner {
    cols: u16,
    rows: u16,
    lines: VecDeque<String>,
    pending_input: Vec<u8>,
    tabs: Vec<String>,
    active_tab: usize,
    focused: FocusedPane,
    split_ratio: f32,
}

#[derive(Debug)]
pub struct TerminalBridge {
    inner: Mutex<BridgeInner>,
}

impl TerminalBridge {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(BridgeInner {
                cols: DEFAULT_COLS,
                rows: DEFAULT_ROWS,
                lines: VecDeque::new(),
                pending_input: Vec::new(),
                tabs: vec!["shell".to_string()],
                active_tab: 0,
                focused: FocusedPane::Terminal,
                split_ratio: 0.6,
            }),
        }
    }

    /// Queue keystrokes for the hosting terminal to deliver to its PTY.
    pub fn send_keys(&self, keys: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.pending_input.extend_from_slice(keys.as_bytes());
        }
    }

    /// Drain queued keystrokes (called by the host).
    pub fn take_input(&self) -> Vec<u8> {
        self.inner
            .lock()
            .map(|mut inner| std::mem::take(&mut inner.pending_input))
            .unwrap_or_default()
    }

    /// Append a line of terminal output (called by the host).
    pub fn feed_line(&self, line: impl Into<String>) {
        if let Ok(mut inner) = self.inner.lock() {
            if inner.lines.len() >= SCROLLBACK_LINES {
                inner.lines.pop_front();
            }
            inner.lines.push_back(line.into());
        }
    }

    /// Visible buffer snapshot: `limit` lines starting `offset` from the top
    /// of the retained buffer. Defaults to the last screenful.
    #[must_use]
    pub fn read_buffer(&self, offset: Option<usize>, limit: Option<usize>) -> Vec<String> {
        let Ok(inner) = self.inner.lock() else {
            return Vec::new();
        };
        match offset {
            Some(offset) => {
                let limit = limit.unwrap_or(inner.rows as usize);
                inner.lines.iter().skip(offset).take(limit).cloned().collect()
            }
            None => {
                let limit = limit.unwrap_or(inner.rows as usize);
                let skip = inner.lines.len().saturating_sub(limit);
                inner.lines.iter().skip(skip).cloned().collect()
            }
        }
    }

    #[must_use]
    pub fn size(&self) -> (u16, u16) {
        self.inner
            .lock()
            .map(|inner| (inner.cols, inner.rows))
            .unwrap_or((DEFAULT_COLS, DEFAULT_ROWS))
    }

    pub fn set_size(&self, cols: u16, rows: u16) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.cols = cols;
            inner.rows = rows;
        }
    }

    #[must_use]
    pub fn tabs(&self) -> Vec<TabInfo> {
        let Ok(inner) = self.inner.lock() else {
            return Vec::new();
        };
        inner
            .tabs
            .iter()
            .enumerate()
            .map(|(index, name)| TabInfo {
                index,
                name: name.clone(),
                active: index == inner.active_tab,
            })
            .collect()
    }

    pub fn set_tabs(&self, names: Vec<String>, active: usize) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.active_tab = active.min(names.len().saturating_sub(1));
            inner.tabs = names;
        }
    }

    #[must_use]
    pub fn layout_state(&self) -> LayoutState {
        let Ok(inner) = self.inner.lock() else {
            return LayoutState {
                focused: FocusedPane::Terminal.label().to_string(),
                split_ratio: 0.6,
            };
        };
        LayoutState {
            focused: inner.focused.label().to_string(),
            split_ratio: inner.split_ratio,
        }
    }

    pub fn set_layout(&self, focused: FocusedPane, split_ratio: f32) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.focused = focused;
            inner.split_ratio = split_ratio.clamp(0.0, 1.0);
        }
    }
}

impl Default for TerminalBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keystrokes_round_trip() {
        let bridge = TerminalBridge::new();
        bridge.send_keys("ls\n");
        bridge.send_keys("pwd\n");
        assert_eq!(bridge.take_input(), b"ls\npwd\n".to_vec());
        assert!(bridge.take_input().is_empty());
    }

    #[test]
    fn read_buffer_returns_last_screenful_by_default() {
        let bridge = TerminalBridge::new();
        bridge.set_size(80, 2);
        for i in 0..5 {
            bridge.feed_line(format!("line {i}"));
        }
        assert_eq!(bridge.read_buffer(None, None), vec!["line 3", "line 4"]);
        assert_eq!(bridge.read_buffer(Some(1), Some(2)), vec!["line 1", "line 2"]);
    }

    #[test]
    fn tabs_mark_active() {
        let bridge = TerminalBridge::new();
        bridge.set_tabs(vec!["shell".into(), "logs".into()], 1);
        let tabs = bridge.tabs();
        assert_eq!(tabs.len(), 2);
        assert!(!tabs[0].active);
        assert!(tabs[1].active);
    }

    #[test]
    fn layout_ratio_is_clamped() {
        let bridge = TerminalBridge::new();
        bridge.set_layout(FocusedPane::Editor, 1.7);
        let layout = bridge.layout_state();
        assert_eq!(layout.focused, "editor");
        assert_eq!(layout.split_ratio, 1.0);
    }
}
