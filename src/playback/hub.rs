use tokio::sync::mpsc;
use tracing::debug;

use super::commands::{PlaybackEvent, SurfaceNotice, SurfaceRole};

/// Fan-out of engine events to the attached surfaces.
///
/// One slot per role; attaching over an occupied slot replaces the previous
/// surface. A surface whose receiver has been dropped is detached on the
/// first failed delivery and never blocks delivery to the other surface.
#[derive(Default)]
pub struct SurfaceHub {
    primary: Option<mpsc::UnboundedSender<PlaybackEvent>>,
    secondary: Option<mpsc::UnboundedSender<PlaybackEvent>>,
    notices: Option<mpsc::UnboundedSender<SurfaceNotice>>,
}

impl SurfaceHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(
        &mut self,
        role: SurfaceRole,
        events: mpsc::UnboundedSender<PlaybackEvent>,
        notices: Option<mpsc::UnboundedSender<SurfaceNotice>>,
    ) {
        debug!(?role, "surface attached");
        match role {
            SurfaceRole::Primary => {
                self.primary = Some(events);
                self.notices = notices;
            }
            SurfaceRole::Secondary => self.secondary = Some(events),
        }
    }

    pub fn detach(&mut self, role: SurfaceRole) {
        debug!(?role, "surface detached");
        match role {
            SurfaceRole::Primary => {
                self.primary = None;
                self.notices = None;
            }
            SurfaceRole::Secondary => self.secondary = None,
        }
    }

    /// Deliver an event to every live surface
    pub fn broadcast(&mut self, event: PlaybackEvent) {
        if let Some(tx) = &self.primary {
            if tx.send(event.clone()).is_err() {
                self.primary = None;
                self.notices = None;
            }
        }
        if let Some(tx) = &self.secondary {
            if tx.send(event).is_err() {
                self.secondary = None;
            }
        }
    }

    /// Tell the primary surface about a state change driven by the secondary
    pub fn notify_primary(&mut self, notice: SurfaceNotice) {
        if let Some(tx) = &self.notices {
            if tx.send(notice).is_err() {
                self.notices = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    #[test]
    fn broadcast_reaches_both_surfaces() {
        let mut hub = SurfaceHub::new();
        let (ptx, mut prx) = unbounded_channel();
        let (stx, mut srx) = unbounded_channel();
        hub.attach(SurfaceRole::Primary, ptx, None);
        hub.attach(SurfaceRole::Secondary, stx, None);

        hub.broadcast(PlaybackEvent::Finished);

        assert_eq!(prx.try_recv(), Ok(PlaybackEvent::Finished));
        assert_eq!(srx.try_recv(), Ok(PlaybackEvent::Finished));
    }

    #[test]
    fn dead_surface_is_skipped_without_disturbing_the_other() {
        let mut hub = SurfaceHub::new();
        let (ptx, mut prx) = unbounded_channel();
        let (stx, srx) = unbounded_channel();
        hub.attach(SurfaceRole::Primary, ptx, None);
        hub.attach(SurfaceRole::Secondary, stx, None);
        drop(srx);

        hub.broadcast(PlaybackEvent::Stopped);
        hub.broadcast(PlaybackEvent::Finished);

        assert_eq!(prx.try_recv(), Ok(PlaybackEvent::Stopped));
        assert_eq!(prx.try_recv(), Ok(PlaybackEvent::Finished));
    }

    #[test]
    fn attaching_a_secondary_replaces_the_previous_one() {
        let mut hub = SurfaceHub::new();
        let (old_tx, mut old_rx) = unbounded_channel();
        let (new_tx, mut new_rx) = unbounded_channel();
        hub.attach(SurfaceRole::Secondary, old_tx, None);
        hub.attach(SurfaceRole::Secondary, new_tx, None);

        hub.broadcast(PlaybackEvent::Finished);

        assert!(old_rx.try_recv().is_err());
        assert_eq!(new_rx.try_recv(), Ok(PlaybackEvent::Finished));
    }

    #[test]
    fn notices_only_go_to_the_primary_channel() {
        let mut hub = SurfaceHub::new();
        let (ptx, mut prx) = unbounded_channel();
        let (ntx, mut nrx) = unbounded_channel();
        hub.attach(SurfaceRole::Primary, ptx, Some(ntx));

        hub.notify_primary(SurfaceNotice::Started);

        assert_eq!(nrx.try_recv(), Ok(SurfaceNotice::Started));
        assert!(prx.try_recv().is_err());
    }
}
