//! 応援メッセージ（名言）のローテーション

use serde::Serialize;

use super::offline::{RandomPicker, ReplyPicker};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub text: &'static str,
    pub author: &'static str,
}

const fn quote(text: &'static str, author: &'static str) -> Quote {
    Quote { text, author }
}

pub const MOTIVATIONAL_QUOTES: [Quote; 10] = [
    quote("Every cigarette not smoked is a victory.", "You"),
    quote("The secret of getting ahead is getting started.", "Mark Twain"),
    quote(
        "It does not matter how slowly you go as long as you do not stop.",
        "Confucius",
    ),
    quote("Your lungs are healing with every breath you take.", "Medical fact"),
    quote(
        "You're not giving something up—you're gaining freedom.",
        "Allen Carr",
    ),
    quote("The pain you feel today is the strength you feel tomorrow.", "Unknown"),
    quote("Cravings pass. Your health is worth the wait.", "Truth"),
    quote("You didn't come this far to only come this far.", "Unknown"),
    quote(
        "The first step towards getting somewhere is to decide you're not going to stay where you are.",
        "J.P. Morgan",
    ),
    quote("Believe you can and you're halfway there.", "Theodore Roosevelt"),
];

/// 現在の名言を保持し、シャッフルで別の名言に切り替える
pub struct QuoteRotation {
    quotes: &'static [Quote],
    index: usize,
    picker: Box<dyn ReplyPicker>,
}

impl QuoteRotation {
    /// 開始位置もpickerで選ぶ
    pub fn new(picker: impl ReplyPicker + 'static) -> Self {
        Self::with_quotes(&MOTIVATIONAL_QUOTES, picker)
    }

    pub fn with_quotes(quotes: &'static [Quote], picker: impl ReplyPicker + 'static) -> Self {
        let mut picker: Box<dyn ReplyPicker> = Box::new(picker);
        let index = if quotes.is_empty() {
            0
        } else {
            picker.pick(quotes.len())
        };

        Self {
            quotes,
            index,
            picker,
        }
    }

    pub fn current(&self) -> Option<&'static Quote> {
        self.quotes.get(self.index)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// 現在とは別の名言へ切り替える（1件しかなければそのまま）
    pub fn shuffle(&mut self) -> Option<&'static Quote> {
        if self.quotes.len() > 1 {
            // 現在位置を除いたlen-1件から選び、現在位置以降は1つずらす
            let pick = self.picker.pick(self.quotes.len() - 1);
            self.index = if pick >= self.index { pick + 1 } else { pick };
            tracing::debug!("✨ [QUOTES] Switched to quote {}", self.index);
        }
        self.current()
    }
}

impl Default for QuoteRotation {
    fn default() -> Self {
        Self::new(RandomPicker::new())
    }
}
