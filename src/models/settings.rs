use serde::{Deserialize, Serialize};

use crate::constants::{
    FALLBACK_SUPPORT_LINK, MSG_DEPOSIT_INSTRUCTION_MISSING, MSG_HISTORY_MISSING,
    MSG_WITHDRAWAL_INSTRUCTION_MISSING,
};

/// Texts and links staff edit for the whole platform
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformSettings {
    pub whatsapp_link: Option<String>,
    pub telegram_link: Option<String>,
    pub history_text: Option<String>,
    pub deposit_instruction: Option<String>,
    pub withdrawal_instruction: Option<String>,
}

fn or_fallback(value: &Option<String>, fallback: &str) -> String {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

/// Accessors fall back to placeholders when settings were never saved
impl PlatformSettings {
    pub fn whatsapp_link(&self) -> String {
        or_fallback(&self.whatsapp_link, FALLBACK_SUPPORT_LINK)
    }

    pub fn telegram_link(&self) -> String {
        or_fallback(&self.telegram_link, FALLBACK_SUPPORT_LINK)
    }

    pub fn history_text(&self) -> String {
        or_fallback(&self.history_text, MSG_HISTORY_MISSING)
    }

    pub fn deposit_instruction(&self) -> String {
        or_fallback(&self.deposit_instruction, MSG_DEPOSIT_INSTRUCTION_MISSING)
    }

    pub fn withdrawal_instruction(&self) -> String {
        or_fallback(&self.withdrawal_instruction, MSG_WITHDRAWAL_INSTRUCTION_MISSING)
    }
}

/// Support links rendered on public pages
#[derive(Debug, Clone, Serialize)]
pub struct SupportLinks {
    pub whatsapp_link: String,
    pub telegram_link: String,
}

impl From<&PlatformSettings> for SupportLinks {
    fn from(settings: &PlatformSettings) -> Self {
        Self {
            whatsapp_link: settings.whatsapp_link(),
            telegram_link: settings.telegram_link(),
        }
    }
}
