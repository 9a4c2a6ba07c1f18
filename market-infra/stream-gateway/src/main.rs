use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use market_core::{CurrencyPair, Quantity, Side};
use stream_gateway::{
    Channel, StreamClient, StreamEvent, WsConnector, load_config, load_default_config,
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const STATUS_INTERVAL: Duration = Duration::from_secs(10);

struct Feed {
    exchange: String,
    client: StreamClient,
    pairs: Vec<CurrencyPair>,
    trades: Arc<AtomicU64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("stream_gateway=info".parse()?))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            tracing::info!("Loading config from {}", path);
            load_config(&path)?
        }
        None => load_default_config()?,
    };
    config.validate()?;

    tracing::info!("Starting stream gateway...");

    let mut feeds = Vec::new();
    for exchange in config.enabled_exchanges() {
        let client = exchange.build_client(&config.global, Arc::new(WsConnector::new()))?;
        let pairs = exchange.pairs()?;
        let trades = Arc::new(AtomicU64::new(0));

        for pair in &pairs {
            let name = exchange.id.clone();
            client
                .subscribe_depth(pair.clone(), exchange.depth_levels, move |event| match event {
                    StreamEvent::OrderBook(book) => tracing::debug!(
                        exchange = %name,
                        pair = %book.pair(),
                        bids = book.bids().len(),
                        asks = book.asks().len(),
                        "Order book updated"
                    ),
                    StreamEvent::ConnectionFailed(reason) => {
                        tracing::error!(exchange = %name, "Feed failed: {}", reason)
                    }
                    _ => {}
                })
                .await?;

            if client.supports(Channel::Trade) {
                let counter = Arc::clone(&trades);
                client
                    .subscribe_trades(pair.clone(), move |event| {
                        if let StreamEvent::Trades(batch) = event {
                            counter.fetch_add(batch.len() as u64, Ordering::Relaxed);
                        }
                    })
                    .await?;
            }

            if let Some(interval) = exchange.kline_interval.filter(|_| client.supports(Channel::Kline)) {
                client
                    .subscribe_klines(pair.clone(), interval, |event| {
                        if let StreamEvent::Kline(kline) = event {
                            tracing::debug!(
                                pair = %kline.pair,
                                interval = %kline.interval,
                                close = %kline.close,
                                "Kline updated"
                            );
                        }
                    })
                    .await?;
            }
        }

        tracing::info!(exchange = %exchange.id, pairs = pairs.len(), "Feed started");
        feeds.push(Feed {
            exchange: exchange.id.clone(),
            client,
            pairs,
            trades,
        });
    }

    let mut status = tokio::time::interval(STATUS_INTERVAL);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = status.tick() => log_status(&feeds),
        }
    }

    tracing::info!("Shutting down...");
    for feed in &feeds {
        feed.client.close().await;
    }

    Ok(())
}

fn log_status(feeds: &[Feed]) {
    for feed in feeds {
        for pair in &feed.pairs {
            match feed.client.current_order_book(pair) {
                Some(book) => tracing::info!(
                    exchange = %feed.exchange,
                    pair = %pair,
                    best_bid = ?book.best_bid().map(|l| l.price.to_string()),
                    best_ask = ?book.best_ask().map(|l| l.price.to_string()),
                    buy_one = ?book.average_fill_price(Side::Ask, Quantity::from_int(1)).map(|p| p.to_string()),
                    "Top of book"
                ),
                None => tracing::info!(exchange = %feed.exchange, pair = %pair, "Order book not synced"),
            }
        }
        tracing::info!(
            exchange = %feed.exchange,
            state = %feed.client.connection_state(),
            trades = feed.trades.load(Ordering::Relaxed),
            "Feed status"
        );
    }
}
