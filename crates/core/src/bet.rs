//! # Bet Module
//!
//! Bets placed against the mock game catalogue. Settlement is handled by an
//! external game engine; here a bet only records the stake and its payout
//! projection.

use crate::error::{CoreError, CoreResult};
use crate::money::to_cents;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Game family a bet belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameType {
    Casino,
    Lottery,
    /// Jogo do Bicho
    JogoBicho,
}

impl GameType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameType::Casino => "casino",
            GameType::Lottery => "lottery",
            GameType::JogoBicho => "jogo_bicho",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "casino" => Some(GameType::Casino),
            "lottery" => Some(GameType::Lottery),
            "jogo_bicho" => Some(GameType::JogoBicho),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GameType::Casino => "Cassino",
            GameType::Lottery => "Loteria",
            GameType::JogoBicho => "Jogo do Bicho",
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetStatus {
    Pending,
    Active,
    Won,
    Lost,
    Cancelled,
    Refunded,
}

impl BetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetStatus::Pending => "pending",
            BetStatus::Active => "active",
            BetStatus::Won => "won",
            BetStatus::Lost => "lost",
            BetStatus::Cancelled => "cancelled",
            BetStatus::Refunded => "refunded",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(BetStatus::Pending),
            "active" => Some(BetStatus::Active),
            "won" => Some(BetStatus::Won),
            "lost" => Some(BetStatus::Lost),
            "cancelled" => Some(BetStatus::Cancelled),
            "refunded" => Some(BetStatus::Refunded),
            _ => None,
        }
    }

    /// Still waiting for the game engine
    pub fn is_open(&self) -> bool {
        matches!(self, BetStatus::Pending | BetStatus::Active)
    }
}

impl fmt::Display for BetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Game-specific selection sent with a bet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GameData {
    Known(GameSelection),
    Other(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "game", rename_all = "snake_case")]
pub enum GameSelection {
    Lottery { numbers: Vec<u8> },
    JogoBicho { animal: String, modality: String },
    Casino { table: String },
}

impl GameData {
    pub fn lottery(numbers: Vec<u8>) -> Self {
        Self::Known(GameSelection::Lottery { numbers })
    }

    pub fn jogo_bicho(animal: &str, modality: &str) -> Self {
        Self::Known(GameSelection::JogoBicho {
            animal: animal.to_string(),
            modality: modality.to_string(),
        })
    }

    pub fn casino(table: &str) -> Self {
        Self::Known(GameSelection::Casino {
            table: table.to_string(),
        })
    }

    /// Parse raw JSON from a client; unknown shapes are kept verbatim.
    pub fn from_json(raw: &str) -> CoreResult<Self> {
        serde_json::from_str(raw)
            .map_err(|e| CoreError::ValidationError(format!("invalid game data: {}", e)))
    }
}

/// A placed bet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bet {
    pub id: String,
    pub user_id: String,
    /// Ledger entry holding the stake
    pub transaction_id: String,
    pub game_type: GameType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_id: Option<String>,
    pub amount: Decimal,
    pub potential_win: Decimal,
    pub actual_win: Decimal,
    pub status: BetStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_data: Option<GameData>,
    pub placed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settled_at: Option<DateTime<Utc>>,
}

impl Bet {
    pub fn new(
        id: String,
        user_id: &str,
        transaction_id: &str,
        game_type: GameType,
        amount: Decimal,
        multiplier: Decimal,
        placed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id: user_id.to_string(),
            transaction_id: transaction_id.to_string(),
            game_type,
            game_id: None,
            amount: to_cents(amount),
            potential_win: potential_win(amount, multiplier),
            actual_win: Decimal::new(0, 2),
            status: BetStatus::Pending,
            game_data: None,
            placed_at,
            settled_at: None,
        }
    }

    pub fn with_game_id(mut self, game_id: Option<String>) -> Self {
        self.game_id = game_id;
        self
    }

    pub fn with_game_data(mut self, game_data: Option<GameData>) -> Self {
        self.game_data = game_data;
        self
    }
}

impl fmt::Display for Bet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bet {} ({}, stake {}, potential {}, {})",
            self.id, self.game_type, self.amount, self.potential_win, self.status
        )
    }
}

/// Mock payout projection: stake x multiplier, in cents.
pub fn potential_win(stake: Decimal, multiplier: Decimal) -> Decimal {
    to_cents(stake.saturating_mul(multiplier))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_game_type_str() {
        assert_eq!(GameType::JogoBicho.as_str(), "jogo_bicho");
        assert_eq!(GameType::from_str("LOTTERY"), Some(GameType::Lottery));
        assert_eq!(GameType::from_str("poker"), None);
        assert_eq!(GameType::JogoBicho.label(), "Jogo do Bicho");
    }

    #[test]
    fn test_new_bet() {
        let bet = Bet::new(
            "b-1".to_string(),
            "u-1",
            "t-1",
            GameType::Lottery,
            dec!(12.5),
            dec!(2),
            Utc::now(),
        );
        assert_eq!(bet.potential_win, dec!(25.00));
        assert_eq!(bet.actual_win, dec!(0));
        assert_eq!(bet.status, BetStatus::Pending);
        assert!(bet.status.is_open());
    }

    #[test]
    fn test_potential_win_rounding() {
        assert_eq!(potential_win(dec!(3.33), dec!(1.5)), dec!(5.00));
        assert_eq!(potential_win(dec!(0.01), dec!(2)), dec!(0.02));
    }

    #[test]
    fn test_game_data_json() {
        let data = GameData::jogo_bicho("leao", "grupo");
        let json = serde_json::to_string(&data).unwrap();
        assert!(json.contains("\"game\":\"jogo_bicho\""));

        let parsed = GameData::from_json(r#"{"game":"lottery","numbers":[4,8,15]}"#).unwrap();
        assert_eq!(parsed, GameData::lottery(vec![4, 8, 15]));

        let free = GameData::from_json(r#"{"spins": 3}"#).unwrap();
        assert!(matches!(free, GameData::Other(_)));

        assert!(GameData::from_json("not json").is_err());
    }
}
