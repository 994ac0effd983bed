use bon::Builder;
use serde::{Deserialize, Serialize};

/// 处理器执行失败时的发布策略
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// 继续执行同一 bucket 中的其余处理器，结束后汇总返回全部失败
    #[default]
    BestEffort,
    /// 遇到首个失败立即停止并返回
    FailFast,
}

/// 事件总线配置
#[derive(Builder, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventBusConfig {
    /// 变更后按优先级升序保持 bucket 有序
    #[builder(default)]
    pub sorted: bool,
    #[builder(default)]
    pub failure_policy: FailurePolicy,
}
