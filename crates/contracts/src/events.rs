//! The events module holds the [EventsWorker]: a lazy, restartable puller of
//! decoded event occurrences. It replays everything matching its filter from
//! an explicit starting block through the chain head, then keeps polling the
//! transport for new logs until it is cooperatively stopped.

use crate::error::{from_middleware_error, ContractError, Result};
use bridge_abi::{EventDescriptor, NamedValues};
use ethers::providers::Middleware;
use ethers::types::{Address, Filter, Log, H256};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How many blocks one catch-up query may span. Keeps `eth_getLogs` requests
/// under typical endpoint limits while replaying long histories.
const DEFAULT_BLOCK_SPAN: u64 = 10_000;

/// How long to wait between polls once the worker has caught up to the head.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// One decoded log occurrence. Occurrences arrive totally ordered by
/// (block number, log index) ascending within one subscription lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventOccurrence {
    pub block_number: u64,
    pub transaction_hash: H256,
    pub log_index: u64,
    pub params: NamedValues,
}

/// Builds the stock log filter for a contract event: the target address plus
/// the descriptor's topic hash. Callers needing indexed-parameter constraints
/// supply their own maker instead; the worker itself never constructs
/// filters, it only windows whatever filter it is given over block ranges.
pub fn contract_filter(address: Address) -> impl Fn(&EventDescriptor) -> Filter {
    move |descriptor| Filter::new().address(address).topic0(descriptor.topic())
}

/// The [EventsWorker] struct pulls matching logs in bounded block spans and
/// hands them out one decoded occurrence at a time.
///
/// Restartability: construction takes an explicit starting block, and
/// [next_block](Self::next_block) exposes the cursor one past the last block
/// already pulled, so a consumer can persist it and resume after a restart,
/// reproducing nothing and missing nothing.
pub struct EventsWorker<M> {
    provider: Arc<M>,
    descriptor: EventDescriptor,
    filter: Filter,
    next_block: u64,
    block_span: u64,
    poll_interval: Duration,
    buffer: VecDeque<Result<EventOccurrence>>,
    cancel: CancellationToken,
    idle: bool,
}

impl<M> EventsWorker<M> {
    /// Creates a worker over `filter` (as produced by the caller's filter
    /// maker), starting at `from_block`.
    pub fn new(
        provider: Arc<M>,
        descriptor: EventDescriptor,
        filter: Filter,
        from_block: u64,
    ) -> Self {
        Self {
            provider,
            descriptor,
            filter,
            next_block: from_block,
            block_span: DEFAULT_BLOCK_SPAN,
            poll_interval: DEFAULT_POLL_INTERVAL,
            buffer: VecDeque::new(),
            cancel: CancellationToken::new(),
            idle: false,
        }
    }

    /// Overrides the poll interval used once the worker is caught up.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// The resume cursor: one past the last block already pulled.
    pub fn next_block(&self) -> u64 {
        self.next_block
    }

    /// A handle for stopping the worker cooperatively. Cancelling halts
    /// further polling; occurrences already pulled are still handed out.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn decode(&self, log: Log) -> Result<EventOccurrence> {
        let block_number = log
            .block_number
            .ok_or_else(|| missing_field(&self.descriptor, "block number"))?
            .as_u64();
        let transaction_hash = log
            .transaction_hash
            .ok_or_else(|| missing_field(&self.descriptor, "transaction hash"))?;
        let log_index = log
            .log_index
            .ok_or_else(|| missing_field(&self.descriptor, "log index"))?
            .as_u64();
        let params = self.descriptor.decode_log(&log.topics, &log.data)?;
        Ok(EventOccurrence {
            block_number,
            transaction_hash,
            log_index,
            params,
        })
    }
}

fn missing_field(descriptor: &EventDescriptor, field: &str) -> ContractError {
    ContractError::Abi(bridge_abi::AbiError::MalformedAbiData(format!(
        "log for `{}` carries no {field}",
        descriptor.name()
    )))
}

impl<M: Middleware> EventsWorker<M> {
    /// Yields the next occurrence, suspending while there is nothing new.
    ///
    /// A log that fails to decode yields `Some(Err(..))` for that occurrence
    /// only; the sequence continues. A transport failure also surfaces as an
    /// error item, without advancing the block cursor, so calling `next`
    /// again retries the same window once the endpoint recovers. `None` means
    /// the worker was cancelled and its buffer has drained.
    pub async fn next(&mut self) -> Option<Result<EventOccurrence>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(item);
            }
            if self.cancel.is_cancelled() {
                return None;
            }
            if self.idle {
                tokio::select! {
                    _ = self.cancel.cancelled() => return None,
                    _ = tokio::time::sleep(self.poll_interval) => {}
                }
            }
            match self.poll_once().await {
                Ok(caught_up) => self.idle = caught_up,
                Err(e) => {
                    self.idle = true;
                    return Some(Err(e));
                }
            }
        }
    }

    /// Pulls one block span's worth of logs. Returns whether the worker has
    /// reached the chain head.
    async fn poll_once(&mut self) -> Result<bool> {
        let head = self
            .provider
            .get_block_number()
            .await
            .map_err(from_middleware_error)?
            .as_u64();
        if head < self.next_block {
            return Ok(true);
        }

        let to = head.min(self.next_block.saturating_add(self.block_span - 1));
        let window = self
            .filter
            .clone()
            .from_block(self.next_block)
            .to_block(to);
        let logs = self
            .provider
            .get_logs(&window)
            .await
            .map_err(from_middleware_error)?;
        tracing::debug!(
            target: "events-worker",
            "{} logs for `{}` in blocks {}..={}",
            logs.len(),
            self.descriptor.name(),
            self.next_block,
            to
        );
        for log in logs {
            let item = self.decode(log);
            self.buffer.push_back(item);
        }
        self.next_block = to + 1;
        Ok(to == head)
    }
}

/// Defines a façade method returning an [EventsWorker] for one descriptor,
/// wired through the façade's invoker.
#[macro_export]
macro_rules! event_worker_method {
    ($(#[$meta:meta])* $fn_name:ident, $descriptor:ident) => {
        $(#[$meta])*
        pub fn $fn_name<F>(&self, filter_maker: F, from_block: u64) -> $crate::EventsWorker<M>
        where
            F: ::core::ops::FnOnce(
                &$crate::bridge_abi::EventDescriptor,
            ) -> ::ethers::types::Filter,
        {
            $crate::EventsWorker::new(
                ::std::sync::Arc::clone(self.invoker.provider()),
                $descriptor.clone(),
                filter_maker(&$descriptor),
                from_block,
            )
        }
    };
}

#[cfg(test)]
mod test {
    use super::*;
    use bridge_abi::{EventParam, Kind, Value};
    use ethers::providers::Provider;
    use ethers::types::{Bytes, U64};

    fn removed_descriptor() -> EventDescriptor {
        EventDescriptor::new(
            "BridgedResourceTypeRemoved",
            vec![EventParam::new("id", Kind::Uint(256), true)],
        )
    }

    fn target() -> Address {
        "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".parse().unwrap()
    }

    fn removed_log(descriptor: &EventDescriptor, block: u64, index: u64, id: u8) -> Log {
        let mut id_word = [0u8; 32];
        id_word[31] = id;
        Log {
            address: target(),
            topics: vec![descriptor.topic(), H256::from(id_word)],
            data: Bytes::default(),
            block_number: Some(U64::from(block)),
            transaction_hash: Some(H256::repeat_byte(id)),
            log_index: Some(index.into()),
            ..Default::default()
        }
    }

    fn worker(provider: Provider<ethers::providers::MockProvider>) -> EventsWorker<Provider<ethers::providers::MockProvider>> {
        let descriptor = removed_descriptor();
        let filter = contract_filter(target())(&descriptor);
        EventsWorker::new(Arc::new(provider), descriptor, filter, 0)
    }

    #[test]
    fn stock_filter_carries_address_and_topic0() {
        let descriptor = removed_descriptor();
        let filter = contract_filter(target())(&descriptor);
        assert_eq!(
            filter.address,
            Some(ethers::types::ValueOrArray::Value(target()))
        );
        assert_eq!(filter.topics[0], Some(descriptor.topic().into()));
    }

    #[tokio::test]
    async fn yields_decoded_occurrences_in_log_order() {
        let descriptor = removed_descriptor();
        let (provider, mock) = Provider::mocked();
        let logs = vec![
            removed_log(&descriptor, 3, 0, 1),
            removed_log(&descriptor, 5, 2, 2),
        ];
        mock.push::<Vec<Log>, _>(logs).unwrap();
        mock.push::<U64, _>(U64::from(5u64)).unwrap();

        let mut worker = worker(provider);
        let first = worker.next().await.unwrap().unwrap();
        let second = worker.next().await.unwrap().unwrap();
        assert_eq!(first.block_number, 3);
        assert_eq!(
            first.params.get("id"),
            Some(&Value::Uint(ethers::types::U256::one()))
        );
        assert_eq!(second.block_number, 5);
        assert_eq!(second.log_index, 2);
        assert_eq!(worker.next_block(), 6);
    }

    #[tokio::test]
    async fn malformed_log_fails_alone_without_ending_the_sequence() {
        let descriptor = removed_descriptor();
        let mut short = removed_log(&descriptor, 2, 0, 1);
        short.topics.truncate(1); // indexed `id` topic missing
        let logs = vec![short, removed_log(&descriptor, 2, 1, 2)];
        let (provider, mock) = Provider::mocked();
        mock.push::<Vec<Log>, _>(logs).unwrap();
        mock.push::<U64, _>(U64::from(2u64)).unwrap();

        let mut worker = worker(provider);
        let first = worker.next().await.unwrap();
        assert!(matches!(
            first,
            Err(ContractError::Abi(
                bridge_abi::AbiError::MalformedAbiData(_)
            ))
        ));
        let second = worker.next().await.unwrap().unwrap();
        assert_eq!(second.log_index, 1);
    }

    #[tokio::test]
    async fn resubscribing_from_the_same_block_reproduces_history() {
        let descriptor = removed_descriptor();
        let history = vec![
            removed_log(&descriptor, 1, 0, 1),
            removed_log(&descriptor, 4, 1, 2),
        ];

        let mut replays = Vec::new();
        for _ in 0..2 {
            let (provider, mock) = Provider::mocked();
            mock.push::<Vec<Log>, _>(history.clone()).unwrap();
            mock.push::<U64, _>(U64::from(4u64)).unwrap();
            let mut worker = worker(provider);
            let mut seen = Vec::new();
            for _ in 0..history.len() {
                seen.push(worker.next().await.unwrap().unwrap());
            }
            replays.push(seen);
        }
        assert_eq!(replays[0], replays[1]);
    }

    #[tokio::test]
    async fn cancellation_stops_polling_but_drains_the_buffer() {
        let descriptor = removed_descriptor();
        let logs = vec![
            removed_log(&descriptor, 1, 0, 1),
            removed_log(&descriptor, 1, 1, 2),
        ];
        let (provider, mock) = Provider::mocked();
        mock.push::<Vec<Log>, _>(logs).unwrap();
        mock.push::<U64, _>(U64::from(1u64)).unwrap();

        let mut worker = worker(provider);
        let first = worker.next().await.unwrap().unwrap();
        assert_eq!(first.log_index, 0);

        worker.cancellation_token().cancel();
        // Already-pulled occurrence still arrives, then the sequence ends.
        let second = worker.next().await.unwrap().unwrap();
        assert_eq!(second.log_index, 1);
        assert!(worker.next().await.is_none());
    }

    #[tokio::test]
    async fn cancelled_worker_with_nothing_buffered_ends_immediately() {
        let (provider, _mock) = Provider::mocked();
        let mut worker = worker(provider);
        worker.cancellation_token().cancel();
        assert!(worker.next().await.is_none());
    }

    #[tokio::test]
    async fn transport_failure_surfaces_without_advancing_the_cursor() {
        // Nothing pushed: the block-number request itself fails.
        let (provider, _mock) = Provider::mocked();
        let mut worker = worker(provider);
        let item = worker.next().await.unwrap();
        assert!(matches!(item, Err(ContractError::TransportUnavailable(_))));
        assert_eq!(worker.next_block(), 0);
    }
}
