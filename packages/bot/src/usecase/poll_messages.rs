//! UseCase: チャットメッセージの定期取得
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - MessagePoller::tick() メソッド
//! - 公開メッセージと個別メッセージの取得、カーソル更新、コマンドへの引き渡し
//!
//! ### なぜこのテストが必要か
//! - 同じメッセージを二度処理しないことを保証
//! - カーソルが前にしか進まないことを確認
//! - ボット自身のメッセージがコマンドとして処理されないことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：公開メッセージ・個別メッセージの処理
//! - 異常系：取得失敗（個別メッセージは相手ごとに独立）、ハンドラのエラー（tick 内の後続メッセージは処理しない）、状態ストアへの記録失敗
//! - エッジケース：取得結果が空、既に処理済みのメッセージが再度返される、同じ sentAt の個別メッセージ

use std::{
    collections::{BTreeSet, VecDeque},
    sync::Arc,
    time::Duration,
};

use tokio::time::MissedTickBehavior;

use crate::domain::{
    ChatMessage, ChatService, CommandContext, CursorStore, PrivateFetchQuery, PublicFetchQuery,
    ResponseChannel, StatusStore, UserId,
};

use super::{dispatch_command::CommandDispatcher, error::PollError};

/// 公開チャンネルで見かけた送信者を覚えておく上限
pub const MAX_OBSERVED_SENDERS: usize = 64;

/// 1 回の tick の集計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// 取得したメッセージ数
    pub fetched: usize,
    /// 処理済みとしてスキップしたメッセージ数
    pub skipped: usize,
    /// ディスパッチに渡したメッセージ数
    pub dispatched: usize,
    /// 個別メッセージの取得に失敗した相手の数
    pub failed_counterparts: usize,
}

/// メッセージ取得のユースケース
pub struct MessagePoller {
    chat: Arc<dyn ChatService>,
    dispatcher: Arc<CommandDispatcher>,
    status: Arc<dyn StatusStore>,
    chat_room_id: String,
    bot_user_id: UserId,
    /// 設定で指定された個別メッセージの相手
    configured_counterparts: Vec<UserId>,
    /// 公開チャンネルで見かけたボット以外の送信者（古い順、最大 `MAX_OBSERVED_SENDERS`）
    observed_senders: VecDeque<UserId>,
    cursors: CursorStore,
}

impl MessagePoller {
    pub fn new(
        chat: Arc<dyn ChatService>,
        dispatcher: Arc<CommandDispatcher>,
        status: Arc<dyn StatusStore>,
        chat_room_id: impl Into<String>,
        bot_user_id: UserId,
        configured_counterparts: Vec<UserId>,
    ) -> Self {
        Self {
            chat,
            dispatcher,
            status,
            chat_room_id: chat_room_id.into(),
            bot_user_id,
            configured_counterparts,
            observed_senders: VecDeque::new(),
            cursors: CursorStore::new(),
        }
    }

    pub fn cursors(&self) -> &CursorStore {
        &self.cursors
    }

    /// 個別メッセージを取得する相手の一覧
    pub fn known_counterparts(&self) -> BTreeSet<UserId> {
        self.configured_counterparts
            .iter()
            .chain(self.cursors.counterparts())
            .chain(self.observed_senders.iter())
            .filter(|id| **id != self.bot_user_id)
            .cloned()
            .collect()
    }

    /// `period` 毎に tick を実行し続ける
    ///
    /// tick は 1 つずつ順番に実行される。前の tick が長引いた場合、遅れた分の tick は
    /// まとめて実行せずにスキップする
    pub async fn run(mut self, period: Duration) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            match self.tick().await {
                Ok(summary) if summary.fetched > 0 => {
                    tracing::debug!(
                        fetched = summary.fetched,
                        skipped = summary.skipped,
                        dispatched = summary.dispatched,
                        failed_counterparts = summary.failed_counterparts,
                        "Poll tick finished"
                    );
                }
                Ok(_) => {}
                Err(e) => tracing::error!("Poll tick failed: {}", e),
            }
        }
    }

    /// 公開メッセージ、続いて既知の相手ごとの個別メッセージを取得して処理する
    ///
    /// 公開メッセージの取得失敗とディスパッチのエラーでは tick を終了する。
    /// 個別メッセージの取得失敗はその相手だけを飛ばし、公開チャンネルで見かけただけの
    /// 相手は取得対象から外す。それまでに進めたカーソルは戻さない
    pub async fn tick(&mut self) -> Result<TickSummary, PollError> {
        let mut summary = TickSummary::default();
        self.poll_public(&mut summary).await?;

        for counterpart in self.known_counterparts() {
            match self.poll_private(&counterpart, &mut summary).await {
                Ok(()) => {}
                Err(e @ PollError::FetchPrivate { .. }) => {
                    tracing::warn!("{}", e);
                    summary.failed_counterparts += 1;
                    self.observed_senders.retain(|sender| *sender != counterpart);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(summary)
    }

    /// 公開チャンネルの送信者を最近見かけた順に覚える
    fn observe_sender(&mut self, sender: &UserId) {
        self.observed_senders.retain(|known| known != sender);
        self.observed_senders.push_back(sender.clone());
        if self.observed_senders.len() > MAX_OBSERVED_SENDERS {
            self.observed_senders.pop_front();
        }
    }

    async fn poll_public(&mut self, summary: &mut TickSummary) -> Result<(), PollError> {
        // 重複判定は取得前のカーソルで行う
        let seen = self.cursors.public().clone();
        let messages = self
            .chat
            .fetch_messages(&self.chat_room_id, &PublicFetchQuery::from_cursor(&seen))
            .await
            .map_err(PollError::FetchPublic)?;
        summary.fetched += messages.len();

        for message in messages {
            if seen.has_seen(&message) {
                tracing::debug!(message_id = %message.id, "Skipping already seen message");
                summary.skipped += 1;
                continue;
            }

            if self.cursors.advance_public(&message) {
                if let Err(e) = self.status.record_public_cursor(self.cursors.public()) {
                    tracing::warn!("Failed to record public cursor: {}", e);
                }
            }

            if let Some(sender) = message.sender.clone().filter(|s| *s != self.bot_user_id) {
                self.observe_sender(&sender);
            }

            let channel = ResponseChannel::Public {
                room_id: self.chat_room_id.clone(),
            };
            if self.process(message, channel).await? {
                summary.dispatched += 1;
            }
        }
        Ok(())
    }

    async fn poll_private(
        &mut self,
        counterpart: &UserId,
        summary: &mut TickSummary,
    ) -> Result<(), PollError> {
        let query = PrivateFetchQuery::from_cursor(self.cursors.private(counterpart));
        let messages = self
            .chat
            .fetch_private_messages(counterpart, &query)
            .await
            .map_err(|source| PollError::FetchPrivate {
                counterpart: counterpart.to_string(),
                source,
            })?;
        summary.fetched += messages.len();

        for message in messages {
            // ボット自身が送ったメッセージは問い合わせた相手のカーソルに記録する
            let key = message
                .sender
                .as_ref()
                .filter(|sender| **sender != self.bot_user_id)
                .unwrap_or(counterpart)
                .clone();

            if self.cursors.has_seen_private(&key, &message) {
                tracing::debug!(message_id = %message.id, "Skipping already seen private message");
                summary.skipped += 1;
                continue;
            }

            if self.cursors.advance_private(&key, &message) {
                if let Some(cursor) = self.cursors.private(&key) {
                    if let Err(e) = self.status.record_private_cursor(&key, cursor) {
                        tracing::warn!(
                            counterpart = %key,
                            "Failed to record private cursor: {}",
                            e
                        );
                    }
                }
            }

            let channel = ResponseChannel::Private { counterpart: key };
            if self.process(message, channel).await? {
                summary.dispatched += 1;
            }
        }
        Ok(())
    }

    /// テキストを取り出し、対象であればディスパッチに渡す
    ///
    /// ディスパッチに渡した場合は `true` を返す
    async fn process(
        &self,
        message: ChatMessage,
        channel: ResponseChannel,
    ) -> Result<bool, PollError> {
        let text = message.extract_text().to_string();
        if text.is_empty() {
            tracing::debug!(message_id = %message.id, "Ignoring message without text");
            return Ok(false);
        }
        if message.is_from(&self.bot_user_id) {
            tracing::debug!(message_id = %message.id, "Ignoring own message");
            return Ok(false);
        }

        let message_id = message.id.to_string();
        let context = CommandContext {
            sender: message.sender.clone(),
            full_message: text,
            chat_message: message,
        };

        self.dispatcher
            .dispatch(&context, &channel)
            .await
            .map_err(|source| {
                tracing::error!(message_id = %message_id, "Failed to process message: {}", source);
                PollError::Dispatch { message_id, source }
            })?;
        Ok(true)
    }
}
