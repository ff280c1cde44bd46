/// 用户档案（来自上游用户服务）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub avatar_url: Option<String>,
}

impl User {
    /// 列表补全失败时的占位用户
    pub fn missing(id: i64) -> Self {
        Self {
            id,
            username: "Missing user".to_string(),
            email: "Missing user".to_string(),
            avatar_url: None,
        }
    }
}
