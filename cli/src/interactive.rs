use std::io::{stdin, stdout, Write};

use anyhow::Result;
use cache_sim::{
    report::{AccessReport, SizeReport},
    sim::{AddressPolicy, Simulator},
    trace,
};

#[cfg(feature = "stat")]
use cache_sim::stat::{LineTable, Stats};

#[cfg(not(feature = "stat"))]
use cache_sim::report::StatsReport;

use crate::{get_terminal_width, Report};

peg::parser!(grammar command() for str {
    rule address() -> u64
        = t:$(quiet!{['0'..='9'] ['0'..='9' | 'a'..='z' | 'A'..='Z']*}) {?
            trace::parse_address(t).map_err(|_| "address")
        }
        / expected!("address")
    rule usize() -> usize
        = n:$(quiet!{['0'..='9']+}) {? n.parse().or(Err("line index")) }
        / expected!("line index")
    rule read() = "read" / "r"
    rule on_off() -> bool
        = "on" { true }
        / "off" { false }
    rule show_kind() -> ShowKind
        = "stat" "s"? { ShowKind::Stat }
        / ("geometry" / "geo") { ShowKind::Geometry }
        / "lines" { ShowKind::Lines }
        / "line" __ n:usize() { ShowKind::Line(n) }
        / "policy" { ShowKind::Policy }
    pub(crate) rule parse_command() -> Command
        = _ read() __ a:address() _ { Command::Read(a) }
        / _ "show" __ s:show_kind() _ { Command::Show(s) }
        / _ "quiet" __ b:on_off() _ { Command::Quiet(b) }
        / _ "strict" __ b:on_off() _ { Command::Strict(b) }
        / _ "reset" _ { Command::Reset }
        / _ ("exit" / "quit") _ { Command::Exit }
        / _ { Command::Nop }

    rule ws() = quiet!{[' ' | '\t' | '\r' | '\n']}
        / expected!("whitespace")
    rule _() = ws()*
    rule __() = ws()+
});

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Command {
    Read(u64),
    Show(ShowKind),
    Quiet(bool),
    Strict(bool),
    Reset,
    Exit,
    Nop,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ShowKind {
    Stat,
    Geometry,
    Lines,
    Line(usize),
    Policy,
}

pub(crate) fn execute_interactive(sim: &mut Simulator, mut report: Report) -> Result<()> {
    let width = get_terminal_width().unwrap_or(60) as usize;
    println!("entering interactive.");
    loop {
        // prompt string
        if sim.policy() == AddressPolicy::Reject {
            print!("[strict] ");
        }
        print!("{} > ", sim.model().name());
        stdout().flush()?;
        let mut str = String::new();
        if stdin().read_line(&mut str)? == 0 {
            break;
        }
        let parsed = match command::parse_command(&str) {
            Ok(p) => p,
            Err(e) => {
                println!("parse error: expected {}", e.expected);
                continue;
            }
        };
        match parsed {
            Command::Read(addr) => match sim.step(addr) {
                Ok(r) => {
                    if report.contains(Report::Access) {
                        println!("{}", AccessReport::new(sim.model().geometry(), &r));
                    } else if r.is_hit() {
                        println!("hit");
                    } else {
                        println!("miss");
                    }
                }
                Err(e) => println!("{e}"),
            },
            Command::Show(s) => show(sim, s, width),
            Command::Quiet(q) => {
                if q == report.contains(Report::Access) {
                    report ^= Report::Access;
                }
                println!(
                    "access report {}",
                    if q { "disabled" } else { "enabled" }
                );
            }
            Command::Strict(b) => {
                sim.set_policy(if b {
                    AddressPolicy::Reject
                } else {
                    AddressPolicy::Truncate
                });
                println!("address policy: {}", sim.policy());
            }
            Command::Reset => {
                sim.reset();
                println!("all lines invalidated, counters cleared.");
            }
            Command::Exit => break,
            Command::Nop => (),
        }
    }
    println!("exiting interactive.");
    Ok(())
}

fn show(sim: &Simulator, kind: ShowKind, width: usize) {
    match kind {
        #[cfg(feature = "stat")]
        ShowKind::Stat => {
            println!("{}", sim.collect_stat().view(width));
        }
        #[cfg(not(feature = "stat"))]
        ShowKind::Stat => {
            println!("{}", StatsReport::new(sim.model()));
        }
        ShowKind::Geometry => {
            println!("{}", SizeReport::new(sim.model()));
        }
        #[cfg(feature = "stat")]
        ShowKind::Lines => {
            let mut stats = Stats::default();
            stats.push(Box::new(LineTable::new(sim.model())));
            println!("{}", stats.view(width));
        }
        #[cfg(not(feature = "stat"))]
        ShowKind::Lines => {
            for n in 0..sim.model().lines().len() {
                show(sim, ShowKind::Line(n), width);
            }
        }
        ShowKind::Line(n) => match sim.model().line(n) {
            Some(line) => match line.tag() {
                Some(tag) => println!("line {n}: tag {tag:#x}"),
                None => println!("line {n}: invalid"),
            },
            None => println!(
                "line {n} out of range for {} lines",
                sim.model().lines().len()
            ),
        },
        ShowKind::Policy => {
            println!("address policy: {}", sim.policy());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_read() {
        assert_eq!(Ok(Command::Read(0x90)), command::parse_command("read 0x90\n"));
        assert_eq!(Ok(Command::Read(144)), command::parse_command("  r 144"));
        assert_eq!(Ok(Command::Read(5)), command::parse_command("r 0b101"));
        assert!(command::parse_command("read zz").is_err());
        assert!(command::parse_command("read 0x1g").is_err());
    }
    #[test]
    fn test_parse_show() {
        use ShowKind::*;
        let cases = [
            ("show stat", Stat),
            ("show stats", Stat),
            ("show geo", Geometry),
            ("show geometry", Geometry),
            ("show lines", Lines),
            ("show line 3", Line(3)),
            ("show policy", Policy),
        ];
        for (input, kind) in cases {
            assert_eq!(Ok(Command::Show(kind)), command::parse_command(input), "{input}");
        }
        assert!(command::parse_command("show line").is_err());
    }
    #[test]
    fn test_parse_misc() {
        assert_eq!(Ok(Command::Quiet(true)), command::parse_command("quiet on"));
        assert_eq!(Ok(Command::Strict(false)), command::parse_command("strict off\n"));
        assert_eq!(Ok(Command::Reset), command::parse_command("reset"));
        assert_eq!(Ok(Command::Exit), command::parse_command("quit"));
        assert_eq!(Ok(Command::Nop), command::parse_command("\n"));
        assert!(command::parse_command("flush").is_err());
    }
}
