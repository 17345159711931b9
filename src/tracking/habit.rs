//! 喫煙習慣プロフィールと通貨定義

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;

/// 表示用通貨コード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Currency {
    #[serde(rename = "USD")]
    Usd,
    #[default]
    #[serde(rename = "EUR")]
    Eur,
    #[serde(rename = "GBP")]
    Gbp,
    #[serde(rename = "CAD")]
    Cad,
    #[serde(rename = "AUD")]
    Aud,
    #[serde(rename = "JPY")]
    Jpy,
    #[serde(rename = "CHF")]
    Chf,
    #[serde(rename = "CNY")]
    Cny,
    #[serde(rename = "INR")]
    Inr,
    #[serde(rename = "BRL")]
    Brl,
    #[serde(rename = "MXN")]
    Mxn,
    #[serde(rename = "KRW")]
    Krw,
}

impl Currency {
    pub const ALL: [Currency; 12] = [
        Currency::Usd,
        Currency::Eur,
        Currency::Gbp,
        Currency::Cad,
        Currency::Aud,
        Currency::Jpy,
        Currency::Chf,
        Currency::Cny,
        Currency::Inr,
        Currency::Brl,
        Currency::Mxn,
        Currency::Krw,
    ];

    /// ISOコード
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Cad => "CAD",
            Currency::Aud => "AUD",
            Currency::Jpy => "JPY",
            Currency::Chf => "CHF",
            Currency::Cny => "CNY",
            Currency::Inr => "INR",
            Currency::Brl => "BRL",
            Currency::Mxn => "MXN",
            Currency::Krw => "KRW",
        }
    }

    /// 表示記号
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Usd => "$",
            Currency::Eur => "€",
            Currency::Gbp => "£",
            Currency::Cad => "C$",
            Currency::Aud => "A$",
            Currency::Jpy | Currency::Cny => "¥",
            Currency::Chf => "CHF",
            Currency::Inr => "₹",
            Currency::Brl => "R$",
            Currency::Mxn => "MX$",
            Currency::Krw => "₩",
        }
    }

    /// 表示名
    pub fn name(&self) -> &'static str {
        match self {
            Currency::Usd => "US Dollar",
            Currency::Eur => "Euro",
            Currency::Gbp => "British Pound",
            Currency::Cad => "Canadian Dollar",
            Currency::Aud => "Australian Dollar",
            Currency::Jpy => "Japanese Yen",
            Currency::Chf => "Swiss Franc",
            Currency::Cny => "Chinese Yuan",
            Currency::Inr => "Indian Rupee",
            Currency::Brl => "Brazilian Real",
            Currency::Mxn => "Mexican Peso",
            Currency::Krw => "South Korean Won",
        }
    }

    /// コードから通貨を解決（大文字小文字は区別しない）
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|currency| currency.code().eq_ignore_ascii_case(code.trim()))
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

// 未知のコードはデフォルト通貨にフォールバックする
impl<'de> Deserialize<'de> for Currency {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let code = Option::<String>::deserialize(deserializer)?;
        Ok(code
            .as_deref()
            .and_then(Currency::from_code)
            .unwrap_or_default())
    }
}

/// ユーザー1人分の喫煙習慣と禁煙開始日時
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitProfile {
    pub cigarettes_per_day: f64,
    /// 表示専用（統計計算には使わない）
    pub years_smoked: f64,
    pub price_per_pack: f64,
    pub cigarettes_per_pack: u32,
    pub quit_date: DateTime<Utc>,
    #[serde(default)]
    pub currency: Currency,
}

impl HabitProfile {
    /// 新規作成（通貨はデフォルト）
    pub fn new(
        cigarettes_per_day: f64,
        years_smoked: f64,
        price_per_pack: f64,
        cigarettes_per_pack: u32,
        quit_date: DateTime<Utc>,
    ) -> Self {
        Self {
            cigarettes_per_day,
            years_smoked,
            price_per_pack,
            cigarettes_per_pack,
            quit_date,
            currency: Currency::default(),
        }
    }

    /// 通貨を設定
    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    /// 禁煙開始日時だけを差し替えたコピーを返す（習慣パラメータは保持）
    pub fn restarted_at(&self, quit_date: DateTime<Utc>) -> Self {
        Self {
            quit_date,
            ..self.clone()
        }
    }

    /// 1本あたりの価格
    pub fn price_per_cigarette(&self) -> f64 {
        self.price_per_pack / self.cigarettes_per_pack as f64
    }

    /// プロフィール編集境界での検証
    ///
    /// 統計計算側は検証しないため、ゼロ除算の防止はここで保証する。
    pub fn validate(&self) -> Result<(), ValidationError> {
        ensure_positive("cigarettes_per_day", self.cigarettes_per_day)?;
        ensure_positive("price_per_pack", self.price_per_pack)?;
        ensure_positive("cigarettes_per_pack", self.cigarettes_per_pack as f64)?;

        if !self.years_smoked.is_finite() {
            return Err(ValidationError::NotFinite {
                field: "years_smoked",
            });
        }
        if self.years_smoked < 0.0 {
            return Err(ValidationError::Negative {
                field: "years_smoked",
                value: self.years_smoked,
            });
        }

        Ok(())
    }
}

fn ensure_positive(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite { field });
    }
    if value <= 0.0 {
        return Err(ValidationError::NotPositive { field, value });
    }
    Ok(())
}

/// オンボーディングの入力ステップ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HabitField {
    CigarettesPerDay,
    YearsSmoked,
    CigarettesPerPack,
    PricePerPack,
}

impl HabitField {
    /// 入力順
    pub const STEPS: [HabitField; 4] = [
        HabitField::CigarettesPerDay,
        HabitField::YearsSmoked,
        HabitField::CigarettesPerPack,
        HabitField::PricePerPack,
    ];

    /// ステッパーの下限・上限（両端を含む）
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            HabitField::CigarettesPerDay => (1.0, 100.0),
            HabitField::YearsSmoked => (0.0, 60.0),
            HabitField::CigarettesPerPack => (10.0, 30.0),
            HabitField::PricePerPack => (1.0, 30.0),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            HabitField::CigarettesPerDay => "cigarettes_per_day",
            HabitField::YearsSmoked => "years_smoked",
            HabitField::CigarettesPerPack => "cigarettes_per_pack",
            HabitField::PricePerPack => "price_per_pack",
        }
    }
}

/// オンボーディング中の入力値
#[derive(Debug, Clone, PartialEq)]
pub struct HabitDraft {
    pub cigarettes_per_day: f64,
    pub years_smoked: f64,
    pub cigarettes_per_pack: u32,
    pub price_per_pack: f64,
    pub currency: Currency,
}

impl Default for HabitDraft {
    fn default() -> Self {
        Self {
            cigarettes_per_day: 10.0,
            years_smoked: 5.0,
            cigarettes_per_pack: 20,
            price_per_pack: 8.0,
            currency: Currency::default(),
        }
    }
}

impl HabitDraft {
    /// 表示通貨を設定
    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn value(&self, field: HabitField) -> f64 {
        match field {
            HabitField::CigarettesPerDay => self.cigarettes_per_day,
            HabitField::YearsSmoked => self.years_smoked,
            HabitField::CigarettesPerPack => self.cigarettes_per_pack as f64,
            HabitField::PricePerPack => self.price_per_pack,
        }
    }

    /// 値をdelta分だけ動かし、ステップの範囲内に収める
    pub fn clamp_step(&mut self, field: HabitField, delta: f64) -> f64 {
        let (min, max) = field.bounds();
        let value = (self.value(field) + delta).clamp(min, max);

        match field {
            HabitField::CigarettesPerDay => self.cigarettes_per_day = value,
            HabitField::YearsSmoked => self.years_smoked = value,
            HabitField::CigarettesPerPack => self.cigarettes_per_pack = value.round() as u32,
            HabitField::PricePerPack => self.price_per_pack = value,
        }

        self.value(field)
    }

    /// 入力完了：禁煙開始日時を現在時刻にしてプロフィールを作る
    pub fn finish(&self, now: DateTime<Utc>) -> Result<HabitProfile, ValidationError> {
        for field in HabitField::STEPS {
            let (min, max) = field.bounds();
            let value = self.value(field);
            if !(min..=max).contains(&value) {
                return Err(ValidationError::OutOfRange {
                    field: field.name(),
                    min,
                    max,
                    value,
                });
            }
        }

        let profile = HabitProfile {
            cigarettes_per_day: self.cigarettes_per_day,
            years_smoked: self.years_smoked,
            price_per_pack: self.price_per_pack,
            cigarettes_per_pack: self.cigarettes_per_pack,
            quit_date: now,
            currency: self.currency,
        };
        profile.validate()?;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_profile() -> HabitProfile {
        HabitProfile::new(
            10.0,
            5.0,
            8.0,
            20,
            Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_currency_symbols() {
        assert_eq!(Currency::Eur.symbol(), "€");
        assert_eq!(Currency::Jpy.symbol(), "¥");
        assert_eq!(Currency::Mxn.symbol(), "MX$");
        assert_eq!(Currency::default(), Currency::Eur);
    }

    #[test]
    fn test_currency_from_code() {
        assert_eq!(Currency::from_code("usd"), Some(Currency::Usd));
        assert_eq!(Currency::from_code(" KRW "), Some(Currency::Krw));
        assert_eq!(Currency::from_code("XYZ"), None);
    }

    #[test]
    fn test_currency_deserialize_fallback() {
        let known: Currency = serde_json::from_str("\"GBP\"").unwrap();
        assert_eq!(known, Currency::Gbp);

        let unknown: Currency = serde_json::from_str("\"DOGE\"").unwrap();
        assert_eq!(unknown, Currency::Eur);

        let missing: Currency = serde_json::from_str("null").unwrap();
        assert_eq!(missing, Currency::Eur);
    }

    #[test]
    fn test_profile_without_currency_uses_default() {
        let json = r#"{
            "cigarettes_per_day": 15.0,
            "years_smoked": 3.0,
            "price_per_pack": 9.5,
            "cigarettes_per_pack": 20,
            "quit_date": "2025-03-01T12:00:00Z"
        }"#;
        let profile: HabitProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.currency, Currency::Eur);
        assert_eq!(profile.cigarettes_per_pack, 20);
    }

    #[test]
    fn test_validate_accepts_sample() {
        assert!(sample_profile().validate().is_ok());

        let mut profile = sample_profile();
        profile.years_smoked = 0.0;
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_pack_size() {
        let mut profile = sample_profile();
        profile.cigarettes_per_pack = 0;
        assert_eq!(
            profile.validate(),
            Err(ValidationError::NotPositive {
                field: "cigarettes_per_pack",
                value: 0.0
            })
        );
    }

    #[test]
    fn test_validate_rejects_bad_numbers() {
        let mut profile = sample_profile();
        profile.cigarettes_per_day = -2.0;
        assert!(matches!(
            profile.validate(),
            Err(ValidationError::NotPositive { field: "cigarettes_per_day", .. })
        ));

        let mut profile = sample_profile();
        profile.price_per_pack = f64::NAN;
        assert!(matches!(
            profile.validate(),
            Err(ValidationError::NotFinite { field: "price_per_pack" })
        ));

        let mut profile = sample_profile();
        profile.years_smoked = -1.0;
        assert!(matches!(
            profile.validate(),
            Err(ValidationError::Negative { field: "years_smoked", .. })
        ));
    }

    #[test]
    fn test_restarted_at_preserves_habit() {
        let profile = sample_profile().with_currency(Currency::Usd);
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let restarted = profile.restarted_at(now);

        assert_eq!(restarted.quit_date, now);
        assert_eq!(restarted.cigarettes_per_day, profile.cigarettes_per_day);
        assert_eq!(restarted.price_per_pack, profile.price_per_pack);
        assert_eq!(restarted.currency, Currency::Usd);
    }

    #[test]
    fn test_price_per_cigarette() {
        assert!((sample_profile().price_per_cigarette() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_draft_clamp_step() {
        let mut draft = HabitDraft::default();
        assert_eq!(draft.clamp_step(HabitField::CigarettesPerDay, 500.0), 100.0);
        assert_eq!(draft.clamp_step(HabitField::YearsSmoked, -10.0), 0.0);
        assert_eq!(draft.clamp_step(HabitField::CigarettesPerPack, -15.0), 10.0);
        assert_eq!(draft.clamp_step(HabitField::PricePerPack, 1.0), 9.0);
    }

    #[test]
    fn test_draft_with_currency() {
        let draft = HabitDraft::default().with_currency(Currency::Gbp);
        assert_eq!(draft.currency, Currency::Gbp);
        assert_eq!(draft.cigarettes_per_day, HabitDraft::default().cigarettes_per_day);
    }

    #[test]
    fn test_draft_finish() {
        let now = Utc.with_ymd_and_hms(2025, 2, 2, 2, 2, 2).unwrap();
        let profile = HabitDraft::default().finish(now).unwrap();

        assert_eq!(profile.quit_date, now);
        assert_eq!(profile.cigarettes_per_day, 10.0);
        assert_eq!(profile.cigarettes_per_pack, 20);

        let draft = HabitDraft {
            cigarettes_per_pack: 50,
            ..HabitDraft::default()
        };
        assert!(matches!(
            draft.finish(now),
            Err(ValidationError::OutOfRange { field: "cigarettes_per_pack", .. })
        ));
    }
}
