//! Supported exchanges and their fixed naming.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::DocsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExchangeId {
    Gate,
    Bybit,
    Okx,
    OkxDex,
    Binance,
    Bitget,
}

impl ExchangeId {
    /// Registration order of the tool table
    pub const ALL: [ExchangeId; 6] = [
        ExchangeId::Gate,
        ExchangeId::Bybit,
        ExchangeId::Okx,
        ExchangeId::OkxDex,
        ExchangeId::Binance,
        ExchangeId::Bitget,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeId::Gate => "gate",
            ExchangeId::Bybit => "bybit",
            ExchangeId::Okx => "okx",
            ExchangeId::OkxDex => "okx-dex",
            ExchangeId::Binance => "binance",
            ExchangeId::Bitget => "bitget",
        }
    }

    /// Exchange name used in tool names and descriptions
    pub fn exchange_name(&self) -> &'static str {
        match self {
            ExchangeId::Gate => "Gate",
            ExchangeId::Bybit => "Bybit",
            ExchangeId::Okx | ExchangeId::OkxDex => "OKX",
            ExchangeId::Binance => "Binance",
            ExchangeId::Bitget => "Bitget",
        }
    }

    pub fn suffix(&self) -> Option<&'static str> {
        match self {
            ExchangeId::OkxDex => Some("DEX API"),
            _ => None,
        }
    }

    /// `OKX DEX API` or `Gate Exchange SDK`
    pub fn display_name(&self) -> String {
        match self.suffix() {
            Some(suffix) => format!("{} {}", self.exchange_name(), suffix),
            None => format!("{} Exchange SDK", self.exchange_name()),
        }
    }

    /// Tool name prefix: `gate`, `okx_dex_api`
    pub fn tool_prefix(&self) -> String {
        let mut prefix = self.exchange_name().to_lowercase();
        if let Some(suffix) = self.suffix() {
            prefix.push('_');
            prefix.push_str(&suffix.to_lowercase().split_whitespace().collect::<Vec<_>>().join("_"));
        }
        prefix
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExchangeId {
    type Err = DocsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        let normalized = match normalized.as_str() {
            "gateio" | "gate.io" => "gate",
            "okxdex" | "okx-dex-api" => "okx-dex",
            other => other,
        };
        ExchangeId::ALL
            .into_iter()
            .find(|id| id.as_str() == normalized)
            .ok_or_else(|| DocsError::UnknownExchange(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_naming() {
        assert_eq!(ExchangeId::Gate.tool_prefix(), "gate");
        assert_eq!(ExchangeId::Gate.display_name(), "Gate Exchange SDK");
        assert_eq!(ExchangeId::OkxDex.tool_prefix(), "okx_dex_api");
        assert_eq!(ExchangeId::OkxDex.display_name(), "OKX DEX API");
    }

    #[test]
    fn test_parse_ids() {
        assert_eq!("okx_dex".parse::<ExchangeId>().unwrap(), ExchangeId::OkxDex);
        assert_eq!("Binance".parse::<ExchangeId>().unwrap(), ExchangeId::Binance);
        assert_eq!("gateio".parse::<ExchangeId>().unwrap(), ExchangeId::Gate);
        assert!(matches!(
            "kraken".parse::<ExchangeId>(),
            Err(DocsError::UnknownExchange(_))
        ));
    }
}
