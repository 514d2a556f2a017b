//! Channel selection: list call legs, prompt, validate.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::display::{SELECT_HINT, TITLE};
use super::session::Session;
use crate::ami::{Leg, Transport};
use crate::input::{InputReader, LinePoll};
use crate::log_debug;

pub const PROMPT: &str = "=> Channel No.: ";

/// Snapshot of one listing. Replaced wholesale on every refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegTable {
    legs: Vec<Leg>,
}

impl LegTable {
    pub fn new(legs: Vec<Leg>) -> Self {
        Self { legs }
    }

    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    /// Rows including the header and footer.
    pub fn table_size(&self) -> usize {
        self.legs.len() + 2
    }

    /// Valid ordinals are `1..table_size - 1`.
    pub fn select(&self, ordinal: usize) -> Option<&Leg> {
        if ordinal >= 1 && ordinal < self.table_size() - 1 {
            self.legs.get(ordinal - 1)
        } else {
            None
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Channels: {}\n", self.legs.len());
        let _ = writeln!(
            out,
            "{:>4} | {:<40} | {:>8} | {:>15} | {:>15}",
            "#", "Channel", "Duration", "Caller ID", "Called No."
        );
        for (i, leg) in self.legs.iter().enumerate() {
            let _ = writeln!(
                out,
                "{:>4} | {:<40} | {:>8} | {:>15} | {:>15}",
                i + 1,
                leg.channel,
                leg.duration,
                leg.caller,
                leg.called
            );
        }
        let _ = writeln!(out, "{}", "-".repeat(94));
        out
    }
}

pub fn parse_ordinal(input: &str) -> Option<usize> {
    input.trim().parse().ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    Selected(Leg),
    Quit,
    Interrupted,
    TransportClosed,
}

pub struct ChannelSelector<'a> {
    transport: &'a dyn Transport,
    session: &'a Session,
    always_refresh: bool,
    poll_interval: Duration,
    table: LegTable,
    notices: Vec<String>,
}

impl<'a> ChannelSelector<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        session: &'a Session,
        always_refresh: bool,
        poll_interval: Duration,
    ) -> Self {
        Self {
            transport,
            session,
            always_refresh,
            poll_interval,
            table: LegTable::default(),
            notices: Vec::new(),
        }
    }

    /// Shown under the table on the next listing.
    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notices.push(notice.into());
    }

    /// Loop until a valid leg is chosen or the operator leaves.
    ///
    /// The caller must have put the session in `Selecting` so topology
    /// events can flag a refresh.
    pub fn run(&mut self, input: &mut InputReader, interrupt: &AtomicBool) -> SelectOutcome {
        loop {
            if interrupt.load(Ordering::SeqCst) {
                return SelectOutcome::Interrupted;
            }
            if self.session.take_refresh() || self.always_refresh {
                self.refresh();
                self.redraw();
            }
            let line = match input.poll_line(self.poll_interval) {
                LinePoll::Pending => continue,
                LinePoll::Line(line) => line,
                LinePoll::Eof => return SelectOutcome::Quit,
                LinePoll::TransportClosed => return SelectOutcome::TransportClosed,
            };
            let choice = line.trim();
            if choice.is_empty() {
                self.session.request_refresh();
                continue;
            }
            if choice.eq_ignore_ascii_case("q") {
                return SelectOutcome::Quit;
            }
            match parse_ordinal(choice).and_then(|n| self.table.select(n)) {
                Some(leg) => {
                    log_debug(&format!("selected channel {}", leg.channel));
                    return SelectOutcome::Selected(leg.clone());
                }
                None => {
                    self.set_notice(format!("Invalid channel number: {choice}"));
                    self.session.request_refresh();
                }
            }
        }
    }

    // The listing runs without the session lock held.
    fn refresh(&mut self) {
        match self.transport.list_legs() {
            Ok(legs) => self.table = LegTable::new(legs),
            Err(err) => {
                log_debug(&format!("channel listing failed: {err:#}"));
                self.table = LegTable::default();
                self.set_notice(format!("Could not list channels: {err}"));
            }
        }
    }

    fn redraw(&mut self) {
        let mut screen = String::from(TITLE);
        screen.push_str(SELECT_HINT);
        screen.push_str(&self.table.render());
        for notice in self.notices.drain(..) {
            let _ = writeln!(screen, "{notice}");
        }
        screen.push_str(PROMPT);
        let mut guard = self.session.lock();
        let result = guard.clear_screen().and_then(|_| guard.print(&screen));
        if let Err(err) = result {
            log_debug(&format!("display write failed: {err}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputEvent;
    use crate::relay::test_support::{FakeTransport, SharedBuffer};
    use crossbeam_channel::unbounded;

    const POLL: Duration = Duration::from_millis(10);

    fn table(n: usize) -> LegTable {
        LegTable::new((0..n).map(|i| Leg::new(&format!("SIP/{i}"))).collect())
    }

    #[test]
    fn ordinals_cover_exactly_the_listed_legs() {
        let t = table(3);
        assert_eq!(t.table_size(), 5);
        let valid: Vec<usize> = (0..10).filter(|n| t.select(*n).is_some()).collect();
        assert_eq!(valid, vec![1, 2, 3]);
        assert_eq!(t.select(1).unwrap().channel, "SIP/0");
    }

    #[test]
    fn empty_table_has_nothing_selectable() {
        let t = table(0);
        assert!(t.is_empty());
        assert_eq!(t.select(0), None);
        assert_eq!(t.select(1), None);
        assert!(t.render().starts_with("Channels: 0\n"));
    }

    #[test]
    fn parse_ordinal_rejects_garbage() {
        assert_eq!(parse_ordinal(" 2 "), Some(2));
        assert_eq!(parse_ordinal("x"), None);
        assert_eq!(parse_ordinal("-1"), None);
    }

    #[test]
    fn render_lists_rows_in_order() {
        let mut legs = vec![Leg::new("SIP/100-1"), Leg::new("DAHDI/1-1")];
        legs[1].caller = "5551212".to_string();
        let rendered = LegTable::new(legs).render();
        assert!(rendered.contains("Channels: 2"));
        let first = rendered.find("SIP/100-1").unwrap();
        let second = rendered.find("DAHDI/1-1").unwrap();
        assert!(first < second);
        assert!(rendered.contains("5551212"));
    }

    fn selecting_session() -> (Session, SharedBuffer) {
        let out = SharedBuffer::default();
        let session = Session::new(Box::new(out.clone()));
        session.enter_selecting();
        (session, out)
    }

    #[test]
    fn picks_valid_ordinal() {
        let transport = FakeTransport::with_legs(&["SIP/100-1", "SIP/200-2"]);
        let (session, out) = selecting_session();
        let (tx, rx) = unbounded();
        tx.send(InputEvent::Bytes(b"2\n".to_vec())).unwrap();
        let mut input = InputReader::new(rx);
        let mut selector = ChannelSelector::new(&transport, &session, false, POLL);
        let outcome = selector.run(&mut input, &AtomicBool::new(false));
        assert_eq!(outcome, SelectOutcome::Selected(Leg::new("SIP/200-2")));
        assert!(out.contents().contains(PROMPT));
        assert_eq!(transport.list_calls(), 1);
    }

    #[test]
    fn invalid_ordinal_is_reported_and_relisted() {
        let transport = FakeTransport::with_legs(&["SIP/100-1"]);
        let (session, out) = selecting_session();
        let (tx, rx) = unbounded();
        tx.send(InputEvent::Bytes(b"7\n1\n".to_vec())).unwrap();
        let mut input = InputReader::new(rx);
        let mut selector = ChannelSelector::new(&transport, &session, false, POLL);
        let outcome = selector.run(&mut input, &AtomicBool::new(false));
        assert_eq!(outcome, SelectOutcome::Selected(Leg::new("SIP/100-1")));
        assert!(out.contents().contains("Invalid channel number: 7"));
        assert_eq!(transport.list_calls(), 2);
    }

    #[test]
    fn q_and_eof_both_quit() {
        let transport = FakeTransport::with_legs(&[]);
        let (session, _out) = selecting_session();
        let (tx, rx) = unbounded();
        tx.send(InputEvent::Bytes(b"Q\n".to_vec())).unwrap();
        let mut input = InputReader::new(rx);
        let mut selector = ChannelSelector::new(&transport, &session, false, POLL);
        assert_eq!(
            selector.run(&mut input, &AtomicBool::new(false)),
            SelectOutcome::Quit
        );

        tx.send(InputEvent::Eof).unwrap();
        assert_eq!(
            selector.run(&mut input, &AtomicBool::new(false)),
            SelectOutcome::Quit
        );
    }

    #[test]
    fn listing_is_reused_until_refresh_is_flagged() {
        let transport = FakeTransport::with_legs(&["SIP/100-1"]);
        let (session, _out) = selecting_session();
        let (tx, rx) = unbounded();
        let mut input = InputReader::new(rx);
        let mut selector = ChannelSelector::new(&transport, &session, false, POLL);

        std::thread::scope(|scope| {
            scope.spawn(|| {
                // Initial listing, then idle polls.
                std::thread::sleep(Duration::from_millis(60));
                session.request_refresh();
                std::thread::sleep(Duration::from_millis(60));
                tx.send(InputEvent::Bytes(b"q\n".to_vec())).unwrap();
            });
            assert_eq!(
                selector.run(&mut input, &AtomicBool::new(false)),
                SelectOutcome::Quit
            );
        });
        assert_eq!(transport.list_calls(), 2);
    }

    #[test]
    fn topology_change_relists_without_losing_typed_digits() {
        let transport = FakeTransport::with_legs(&["SIP/100-1", "SIP/200-2"]);
        let (session, out) = selecting_session();
        let (tx, rx) = unbounded();
        let mut input = InputReader::new(rx);
        let mut selector = ChannelSelector::new(&transport, &session, false, POLL);

        let outcome = std::thread::scope(|scope| {
            scope.spawn(|| {
                let wait_for_listings = |count: usize| {
                    for _ in 0..200 {
                        if transport.list_calls() >= count {
                            return;
                        }
                        std::thread::sleep(Duration::from_millis(5));
                    }
                    panic!("expected {count} listings, saw {}", transport.list_calls());
                };
                wait_for_listings(1);
                tx.send(InputEvent::Bytes(b"1".to_vec())).unwrap();
                std::thread::sleep(POLL * 3);
                session.request_refresh();
                wait_for_listings(2);
                tx.send(InputEvent::Bytes(b"\n".to_vec())).unwrap();
            });
            selector.run(&mut input, &AtomicBool::new(false))
        });

        assert_eq!(outcome, SelectOutcome::Selected(Leg::new("SIP/100-1")));
        assert_eq!(transport.list_calls(), 2);
        assert_eq!(out.contents().matches(PROMPT).count(), 2);
    }

    #[test]
    fn bare_enter_relists() {
        let transport = FakeTransport::with_legs(&["SIP/100-1"]);
        let (session, _out) = selecting_session();
        let (tx, rx) = unbounded();
        tx.send(InputEvent::Bytes(b"\n\nq\n".to_vec())).unwrap();
        let mut input = InputReader::new(rx);
        let mut selector = ChannelSelector::new(&transport, &session, false, POLL);
        selector.run(&mut input, &AtomicBool::new(false));
        assert_eq!(transport.list_calls(), 3);
    }

    #[test]
    fn listing_failure_is_shown_inline() {
        let transport = FakeTransport::with_legs(&["SIP/100-1"]);
        *transport.fail_listing.lock().unwrap() = true;
        let (session, out) = selecting_session();
        let (tx, rx) = unbounded();
        tx.send(InputEvent::Bytes(b"1\nq\n".to_vec())).unwrap();
        let mut input = InputReader::new(rx);
        let mut selector = ChannelSelector::new(&transport, &session, false, POLL);
        assert_eq!(
            selector.run(&mut input, &AtomicBool::new(false)),
            SelectOutcome::Quit
        );
        let screen = out.contents();
        assert!(screen.contains("Could not list channels"));
        assert!(screen.contains("Invalid channel number: 1"));
    }

    #[test]
    fn interrupt_flag_stops_selection() {
        let transport = FakeTransport::with_legs(&["SIP/100-1"]);
        let (session, _out) = selecting_session();
        let (_tx, rx) = unbounded();
        let mut input = InputReader::new(rx);
        let mut selector = ChannelSelector::new(&transport, &session, false, POLL);
        assert_eq!(
            selector.run(&mut input, &AtomicBool::new(true)),
            SelectOutcome::Interrupted
        );
    }

    #[test]
    fn transport_close_ends_selection() {
        let transport = FakeTransport::with_legs(&[]);
        let (session, _out) = selecting_session();
        let (tx, rx) = unbounded();
        tx.send(InputEvent::TransportClosed).unwrap();
        let mut input = InputReader::new(rx);
        let mut selector = ChannelSelector::new(&transport, &session, false, POLL);
        assert_eq!(
            selector.run(&mut input, &AtomicBool::new(false)),
            SelectOutcome::TransportClosed
        );
    }
}
