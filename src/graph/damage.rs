use crate::geo::envelope::Envelope;
use crate::graph::pad::PadRef;

/// Notification that content previously pulled from `pad` may have changed.
#[derive(Clone, Debug, PartialEq)]
pub struct Damage {
    /// Output pad whose content is stale.
    pub pad: PadRef,
    /// Affected region, `None` for "everything".
    pub region: Option<Envelope>,
}

/// Handle returned by a subscription, used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Callback invoked synchronously on damage.
pub type DamageFn = Box<dyn Fn(&Damage) + Send + Sync>;

/// Observer list keyed by output pad.
#[derive(Default)]
pub(crate) struct DamageBus {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, PadRef, DamageFn)>,
}

impl DamageBus {
    pub(crate) fn subscribe(&mut self, pad: PadRef, f: DamageFn) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, pad, f));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _, _)| *sid != id);
        self.subscribers.len() != before
    }

    pub(crate) fn notify(&self, damage: &Damage) {
        for (_, pad, f) in &self.subscribers {
            if *pad == damage.pad {
                f(damage);
            }
        }
    }
}

impl std::fmt::Debug for DamageBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DamageBus")
            .field("subscribers", &self.subscribers.len())
            .finish_non_exhaustive()
    }
}
