use std::io::{self, BufRead, Write};

use chrono::{Local, NaiveDateTime};
use tracing::{error, warn};

use crate::gemini::chat::{Chat, ChatSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Exit,
}

pub struct FixTypoRepl<T: Chat> {
    session: ChatSession<T>,
    display_user: String,
    display_model: String,
    clock: Box<dyn Fn() -> NaiveDateTime>,
}

impl<T: Chat> FixTypoRepl<T> {
    const WELCOME: &'static str = "Welcome to the FixTypo! Type 'exit' to end.";

    pub fn new(chat: T) -> Self {
        Self {
            session: ChatSession::new(chat),
            display_user: "🤠".to_string(),
            display_model: "✨".to_string(),
            clock: Box::new(|| Local::now().naive_local()),
        }
    }
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDateTime + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }
    pub fn session(&self) -> &ChatSession<T> {
        &self.session
    }

    /// Drives the loop until end of input or the exit command.
    ///
    /// Read failures end the loop and are logged, not returned. Only write
    /// failures on `out` surface as `Err`.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> io::Result<()> {
        writeln!(out, "{}", Self::WELCOME)?;
        let mut lines = input.lines();
        let read_error = loop {
            self.prompt(out)?;
            match lines.next() {
                None => break None,
                Some(Err(e)) => break Some(e),
                Some(Ok(line)) => {
                    if self.step(&line, out)? == Step::Exit {
                        break None;
                    }
                }
            }
        };
        if let Some(e) = read_error {
            error!("Error reading input: {}", e);
        }
        Ok(())
    }

    /// Handles one line of input against the session.
    pub fn step<W: Write>(&mut self, line: &str, out: &mut W) -> io::Result<Step> {
        if Self::is_exit(line) {
            writeln!(out, "\nGoodbye!")?;
            return Ok(Step::Exit);
        }
        match self.session.send(line) {
            Ok(reply) => {
                writeln!(out, "{}: {}", self.display_model, reply)?;
            }
            Err(e) => {
                warn!(kind = %e.kind, "send failed");
                writeln!(out, "Error sending message: {}", e)?;
            }
        }
        out.flush()?;
        Ok(Step::Continue)
    }

    fn prompt<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "--- {}", banner(&(self.clock)()))?;
        write!(out, "{}: ", self.display_user)?;
        out.flush()
    }
    fn is_exit(line: &str) -> bool {
        line.trim().eq_ignore_ascii_case("exit")
    }
}

const BANNER_FORMAT: &str = "%A, %B %-d, %Y at %H:%M";

pub fn banner(time: &NaiveDateTime) -> String {
    time.format(BANNER_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use chrono::NaiveDate;

    use super::*;
    use crate::gemini::{chat::fakes::FakeChat, GeminiClientErrorKind};

    fn fixed_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 17)
            .unwrap()
            .and_hms_opt(9, 5, 0)
            .unwrap()
    }
    fn run_with(fake: FakeChat, input: &str) -> (FixTypoRepl<FakeChat>, String) {
        let mut sut = FixTypoRepl::new(fake).with_clock(fixed_time);
        let mut out: Vec<u8> = Vec::new();
        sut.run(Cursor::new(input.to_string()), &mut out).unwrap();
        (sut, String::from_utf8(out).unwrap())
    }

    #[test]
    fn banner_uses_weekday_month_day_year_and_24h_time() {
        assert_eq!(banner(&fixed_time()), "Monday, June 17, 2024 at 09:05");
        let evening = NaiveDate::from_ymd_opt(2023, 12, 3)
            .unwrap()
            .and_hms_opt(21, 30, 59)
            .unwrap();
        assert_eq!(banner(&evening), "Sunday, December 3, 2023 at 21:30");
    }
    #[test]
    fn exit_on_first_line_says_goodbye_without_reply() {
        let (sut, out) = run_with(FakeChat::new(), "exit\nhello\n");

        assert!(out.starts_with("Welcome to the FixTypo! Type 'exit' to end.\n"));
        assert!(out.contains("--- Monday, June 17, 2024 at 09:05\n🤠: "));
        assert!(out.contains("\nGoodbye!\n"));
        assert!(!out.contains("✨"));
        assert!(sut.session().chat().sent().is_empty());
    }
    #[test]
    fn exit_is_case_insensitive_and_trimmed() {
        for line in ["exit", "EXIT", "  Exit  ", "\teXiT"] {
            let mut sut = FixTypoRepl::new(FakeChat::new());
            let mut out: Vec<u8> = Vec::new();

            let step = sut.step(line, &mut out).unwrap();

            assert_eq!(step, Step::Exit, "{:?}", line);
            assert!(sut.session().chat().sent().is_empty());
        }
    }
    #[test]
    fn words_containing_exit_are_sent() {
        let mut fake = FakeChat::new();
        fake.add_reply("Exit here.");
        let mut sut = FixTypoRepl::new(fake);
        let mut out: Vec<u8> = Vec::new();

        let step = sut.step("exit here", &mut out).unwrap();

        assert_eq!(step, Step::Continue);
        assert_eq!(String::from_utf8(out).unwrap(), "✨: Exit here.\n");
    }
    #[test]
    fn replies_are_printed_with_marker_until_end_of_input() {
        let mut fake = FakeChat::new();
        fake.add_reply("Colour is spelt with a u. 🎨");
        fake.add_reply("Organise, not organize.");
        let (sut, out) = run_with(fake, "color\norganize\n");

        assert!(out.contains("🤠: ✨: Colour is spelt with a u. 🎨\n"));
        assert!(out.contains("🤠: ✨: Organise, not organize.\n"));
        assert_eq!(out.matches("--- Monday").count(), 3);
        assert!(!out.contains("Goodbye"));
        assert_eq!(sut.session().history().len(), 4);
    }
    #[test]
    fn failed_turn_prints_error_and_next_turn_succeeds() {
        let mut fake = FakeChat::new();
        fake.add_reply("First.");
        fake.add_error(GeminiClientErrorKind::RequestError("timed out".to_string()));
        fake.add_reply("Third.");
        let (sut, out) = run_with(fake, "first\nsecond\nthird\nexit\n");

        assert!(out.contains("🤠: Error sending message: "));
        assert!(out.contains("timed out"));
        assert_eq!(out.matches("✨: ").count(), 2);
        assert!(out.contains("✨: Third.\n"));
        let sent = sut.session().chat().sent();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[2].0.len(), 2);
        assert_eq!(sut.session().history().len(), 4);
    }
    #[test]
    fn carriage_returns_are_not_sent() {
        let mut fake = FakeChat::new();
        fake.add_reply("Hi.");
        let (sut, _) = run_with(fake, "hi\r\nEXIT\r\n");

        assert_eq!(sut.session().chat().sent()[0].1, "hi");
    }
    #[test]
    fn read_error_ends_loop_without_failing() {
        struct BrokenInput;
        impl io::Read for BrokenInput {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "stdin closed badly"))
            }
        }
        let mut sut = FixTypoRepl::new(FakeChat::new()).with_clock(fixed_time);
        let mut out: Vec<u8> = Vec::new();

        let result = sut.run(io::BufReader::new(BrokenInput), &mut out);

        assert!(result.is_ok());
        assert!(sut.session().chat().sent().is_empty());
    }
    #[test]
    fn invalid_utf8_input_is_a_read_error() {
        let mut sut = FixTypoRepl::new(FakeChat::new()).with_clock(fixed_time);
        let mut out: Vec<u8> = Vec::new();

        let result = sut.run(Cursor::new(vec![0xff, 0xfe, b'\n']), &mut out);

        assert!(result.is_ok());
        assert!(sut.session().chat().sent().is_empty());
    }
}
