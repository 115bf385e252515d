//! Request and response types for the Tail Trading API

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Credentials for `POST /auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// `POST /auth/login` response.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub username: String,
    #[serde(default)]
    pub nickname: Option<String>,
}

impl LoginResponse {
    /// Name to greet the user with: nickname when set, else username.
    pub fn display_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.username)
    }
}

/// Selection strategy. Each maps to its own endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Adapts to the current market regime.
    Smart,
    /// Volume-pullback plus limit-up logic.
    Enhanced,
    /// The original baseline strategy.
    Traditional,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Smart, Strategy::Enhanced, Strategy::Traditional];

    pub(crate) fn endpoint(&self) -> &'static str {
        match self {
            Strategy::Smart => "/stock/smart-select",
            Strategy::Enhanced => "/stock/enhanced-select",
            Strategy::Traditional => "/stock/select",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Strategy::Smart => "smart",
            Strategy::Enhanced => "enhanced",
            Strategy::Traditional => "traditional",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Parameters shared by all three selection endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct SelectRequest {
    /// Risk preset the backend scripts understand.
    pub preset: String,
    pub limit: u32,
    pub verbose: bool,
}

impl Default for SelectRequest {
    fn default() -> Self {
        Self {
            preset: "balanced".to_string(),
            limit: 20,
            verbose: false,
        }
    }
}

/// Selection endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct SelectResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Vec<StockRow>,
    #[serde(default)]
    pub log: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// One selected stock.
///
/// The selection scripts emit rows with unstable field names (Chinese and
/// English variants, varying by strategy), so rows are kept as raw JSON
/// with accessors that try the known aliases in priority order.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct StockRow(pub Value);

impl StockRow {
    fn field(&self, aliases: &[&str]) -> Option<&Value> {
        aliases.iter().find_map(|key| self.0.get(key))
    }

    fn display(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            other => other.to_string(),
        }
    }

    pub fn code(&self) -> String {
        self.field(&["代码", "code", "股票代码", "symbol"])
            .map(Self::display)
            .unwrap_or_else(|| "-".to_string())
    }

    pub fn name(&self) -> String {
        self.field(&["名称", "name", "股票名称"])
            .map(Self::display)
            .unwrap_or_else(|| "-".to_string())
    }

    /// Probability/score column; every strategy names it differently.
    pub fn score(&self) -> String {
        self.field(&[
            "次日补涨概率",
            "probability_score",
            "概率分数",
            "score",
            "技术评分",
            "适应性评分",
            "增强评分",
        ])
        .map(Self::display)
        .unwrap_or_else(|| "-".to_string())
    }

    pub fn risk(&self) -> String {
        self.field(&["风险评分", "risk_level", "风险等级", "risk"])
            .map(Self::display)
            .unwrap_or_else(|| "-".to_string())
    }

    pub fn action(&self) -> String {
        self.field(&["操作建议", "action", "建议", "选股类型"])
            .map(Self::display)
            .unwrap_or_else(|| "买入".to_string())
    }
}

/// Wire field that arrives as either a number or a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NumOrStr {
    Num(f64),
    Str(String),
}

impl NumOrStr {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            NumOrStr::Num(n) => Some(*n),
            NumOrStr::Str(s) => s.trim().trim_end_matches('%').parse().ok(),
        }
    }
}

impl std::fmt::Display for NumOrStr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NumOrStr::Num(n) => write!(f, "{n}"),
            NumOrStr::Str(s) => f.write_str(s),
        }
    }
}

/// One row of the top-concepts ranking.
#[derive(Debug, Clone, Deserialize)]
pub struct ConceptRow {
    pub rank: u32,
    pub concept: String,
    pub heat_score: NumOrStr,
    pub change_pct: NumOrStr,
}

/// `GET /stock/top-concepts` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ConceptsResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Vec<ConceptRow>,
    #[serde(default)]
    pub update_time: Option<String>,
}

/// `GET /stock/strategy-results` response.
#[derive(Debug, Clone, Deserialize)]
pub struct StrategyResults {
    pub success: bool,
    #[serde(default)]
    pub data: Option<StrategyResultsData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StrategyResultsData {
    #[serde(default)]
    pub smart: Option<StrategySlot>,
    #[serde(default)]
    pub enhanced: Option<StrategySlot>,
    #[serde(default)]
    pub select: Option<StrategySlot>,
}

impl StrategyResultsData {
    pub fn get(&self, strategy: Strategy) -> Option<&StrategySlot> {
        match strategy {
            Strategy::Smart => self.smart.as_ref(),
            Strategy::Enhanced => self.enhanced.as_ref(),
            Strategy::Traditional => self.select.as_ref(),
        }
    }
}

/// Stored result set for one strategy.
#[derive(Debug, Clone, Deserialize)]
pub struct StrategySlot {
    #[serde(default)]
    pub data: Vec<StockRow>,
    #[serde(default)]
    pub count: u64,
}

/// `{success, message}` acknowledgment used by maintenance endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct AckResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

/// Bare `{message}` acknowledgment.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// `GET /scheduler/status` response.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerStatus {
    /// Older servers report `is_running` instead.
    #[serde(default, alias = "is_running")]
    pub running: bool,
    #[serde(default)]
    pub next_run: Option<String>,
}

/// `POST /scheduler/start` body.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStartRequest {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cron_expression: Option<String>,
}

/// `GET /scheduler/logs` response.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerLogs {
    #[serde(default)]
    pub logs: Vec<String>,
}

/// `GET /health` response.
#[derive(Debug, Clone, Deserialize)]
pub struct Health {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_row_prefers_native_field_names() {
        let row: StockRow = serde_json::from_str(
            r#"{"代码":"600519","code":"wrong","名称":"贵州茅台","次日补涨概率":72.5}"#,
        )
        .unwrap();
        assert_eq!(row.code(), "600519");
        assert_eq!(row.name(), "贵州茅台");
        assert_eq!(row.score(), "72.5");
    }

    #[test]
    fn test_stock_row_falls_back_through_aliases() {
        let row: StockRow =
            serde_json::from_str(r#"{"symbol":"000001","name":"平安银行","score":88}"#).unwrap();
        assert_eq!(row.code(), "000001");
        assert_eq!(row.name(), "平安银行");
        assert_eq!(row.score(), "88");
        assert_eq!(row.risk(), "-");
        assert_eq!(row.action(), "买入");
    }

    #[test]
    fn test_select_response_defaults_missing_fields() {
        let response: SelectResponse =
            serde_json::from_str(r#"{"success":true,"message":"ok"}"#).unwrap();
        assert!(response.success);
        assert!(response.data.is_empty());
        assert!(response.log.is_none());
    }

    #[test]
    fn test_scheduler_status_accepts_legacy_field() {
        let status: SchedulerStatus = serde_json::from_str(r#"{"is_running":true}"#).unwrap();
        assert!(status.running);

        let status: SchedulerStatus =
            serde_json::from_str(r#"{"running":true,"next_run":"2026-08-07T15:00:00"}"#).unwrap();
        assert!(status.running);
        assert_eq!(status.next_run.as_deref(), Some("2026-08-07T15:00:00"));
    }

    #[test]
    fn test_num_or_str_parses_percent_strings() {
        let n: NumOrStr = serde_json::from_str("82.5").unwrap();
        assert_eq!(n.as_f64(), Some(82.5));

        let s: NumOrStr = serde_json::from_str(r#""3.41%""#).unwrap();
        assert_eq!(s.as_f64(), Some(3.41));

        let bad: NumOrStr = serde_json::from_str(r#""n/a""#).unwrap();
        assert_eq!(bad.as_f64(), None);
    }

    #[test]
    fn test_login_display_name_prefers_nickname() {
        let with: LoginResponse = serde_json::from_str(
            r#"{"access_token":"t","token_type":"bearer","username":"u","nickname":"nick"}"#,
        )
        .unwrap();
        assert_eq!(with.display_name(), "nick");

        let without: LoginResponse =
            serde_json::from_str(r#"{"access_token":"t","token_type":"bearer","username":"u"}"#)
                .unwrap();
        assert_eq!(without.display_name(), "u");
    }

    #[test]
    fn test_scheduler_start_request_omits_unset_cron() {
        let body = SchedulerStartRequest {
            enabled: true,
            cron_expression: None,
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"enabled":true}"#
        );
    }
}
