use serde::Deserialize;

pub const INVALID_BODY: &str = "invalid JSON body";

#[derive(Debug, Default, Deserialize)]
pub struct AddUserRequest {
    // 缺失或为 null 时按空名字处理，由目录服务返回 400
    #[serde(default)]
    pub name: Option<String>,
}
