//! Helpers for observing blink-lock notices in Bevy tests.
use bevy::ecs::prelude::On;
use bevy::prelude::*;
use blink_lock::{BlinkLockNotice, LockEvent};

/// Notices captured during a test, in emission order.
#[derive(Resource, Default, Debug)]
pub struct CapturedNotices(pub Vec<(Entity, LockEvent)>);

#[expect(
    clippy::needless_pass_by_value,
    reason = "Observer systems must take On<T> by value."
)]
fn record_notice(notice: On<BlinkLockNotice>, mut captured: ResMut<CapturedNotices>) {
    let BlinkLockNotice { caster, event } = notice.event();
    captured.0.push((*caster, event.clone()));
}

/// Installs the capturing observer and resource on the provided app.
pub fn install_notice_observer(app: &mut App) {
    app.insert_resource(CapturedNotices::default());
    app.world_mut().add_observer(record_notice);
}
