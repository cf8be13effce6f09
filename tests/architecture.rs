//! Thread-safety checks for everything shared across tasks.

use crash_radar::avatar::RiskAvatarManager;
use crash_radar::chat::ChatRouter;
use crash_radar::oracle::{FtsoV2Client, PriceSource, StaticPriceSource};
use crash_radar::server::AppState;
use crash_radar::{RiskDesk, RiskEngine};

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn test_shared_state_is_thread_safe() {
    assert_send_sync::<RiskEngine>();
    assert_send_sync::<RiskDesk>();
    assert_send_sync::<ChatRouter>();
    assert_send_sync::<AppState>();
    assert_send_sync::<RiskAvatarManager>();
}

#[test]
fn test_price_sources_are_thread_safe() {
    assert_send_sync::<FtsoV2Client>();
    assert_send_sync::<StaticPriceSource>();
    assert_send_sync::<Box<dyn PriceSource>>();
}
