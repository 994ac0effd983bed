//! 进程内类型化发布/订阅总线（sebus）
//!
//! 订阅者是普通对象，通过 `#[subscribe]` 标记处理事件的方法；
//! 发布一个值时，总线按值的运行时类型找到全部处理器并在调用方线程上同步调用：
//! - 订阅者方法表（`subscriber`）与调用器（`invoker`）：把处理器绑定为可直接调用的闭包
//! - 处理器描述（`descriptor`）：订阅者身份、处理器名称、事件类型与优先级
//! - 订阅缓存（`cache`）：按订阅者缓存已构建的描述，重复注册无需重新扫描
//! - 注册表（`registry`）：事件类型到处理器 bucket 的写时复制映射
//! - 事件总线（`bus`）：注册/注销/发布的入口，配置见 `config`
//!
//! 总线只持有订阅者的 `Weak` 引用，订阅者被释放后其处理器在发布时被静默跳过。
//!
//! 典型用法：
//! 1. 在订阅者的 `impl` 块上使用 `#[subscriber]`，并以 `#[subscribe]` 标记处理器；
//! 2. `EventBus::register(&Arc<T>)` 注册订阅者；
//! 3. `EventBus::publish(&event)` 发布事件。
//!
pub mod bus;
pub mod cache;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod event_type;
pub mod invoker;
pub mod registry;
pub mod subscriber;

// 允许在本 crate 内部通过 ::sebus 进行自引用，
// 以便过程宏在本 crate 的单元测试中也能解析到 ::sebus 路径。
extern crate self as sebus;
