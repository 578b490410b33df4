//! tether-core
//!
//! Typed delegates: bind an object and one of its methods into a value that
//! can be called in place, broadcast through a multicast list, or shipped to
//! another thread as a single-use capsule.
//!
//! # モジュール構成
//! - **params**: 引数リスト（タプル）と束縛可能なメソッド（`Method`）
//! - **binding**: target + method の組（不変、target は Weak で観測するだけ）
//! - **delegate**: 同期ハンドル `MemberDelegate` と type erasure 用 `Delegate` trait
//! - **multicast**: `Multicast` - 登録順に呼び出すハンドルのリスト
//! - **capsule**: スレッドを跨いで運ばれる単発の呼び出し記録
//! - **channel**: `DispatchChannel` port
//! - **async_delegate**: 呼び出しを capsule にして channel へ渡すハンドル
//! - **worker**: `WorkerThread` - channel のリファレンス実装
//! - **error**: エラー型

pub mod async_delegate;
pub mod binding;
pub mod capsule;
pub mod channel;
pub mod delegate;
pub mod error;
pub mod multicast;
pub mod params;
pub mod worker;

pub use self::async_delegate::{AsyncDelegate, bind_async};
pub use self::binding::Binding;
pub use self::capsule::{CallCapsule, Capsule};
pub use self::channel::{DispatchChannel, ThreadMsg};
pub use self::delegate::{Delegate, MemberDelegate, bind};
pub use self::error::DelegateError;
pub use self::multicast::Multicast;
pub use self::params::{Method, Params};
pub use self::worker::{PanicPolicy, WorkerBuilder, WorkerConfig, WorkerState, WorkerStats, WorkerThread};
