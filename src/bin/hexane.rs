use hexane::cpu::decode::Decoder;
use hexane::cpu::disasm::{self, AsmPrinter, TermPrinter};
use hexane::cpu::instr::Register;
use hexane::cpu::interpret::Interpreter;
use hexane::cpu::State;

use structopt::StructOpt;
use termcolor::{ColorChoice, StandardStream};

use std::error::Error;
use std::fs::{self, File};
use std::path::PathBuf;
use std::process;

#[derive(Debug, StructOpt)]
#[structopt(name = "hexane", about = "8086 machine code decoder and simulator.")]
struct Opt {
    /// Path to the raw 8086 machine code image.
    #[structopt(parse(from_os_str))]
    path: PathBuf,
    /// Execute the image instead of just listing it, tracing every
    /// instruction's effect on registers, flags and clocks.
    #[structopt(short = "e", long = "execute")]
    execute: bool,
    /// After execution, write the registers, flags and instruction pointer
    /// to this file in binary form.
    #[structopt(long = "dump-state", parse(from_os_str))]
    dump_state: Option<PathBuf>,
    /// After execution, write the full memory image to this file.
    #[structopt(long = "dump-memory", parse(from_os_str))]
    dump_memory: Option<PathBuf>,
}

fn run() -> Result<(), Box<dyn Error>> {
    let opt = Opt::from_args();

    if !opt.execute && (opt.dump_state.is_some() || opt.dump_memory.is_some()) {
        return Err("--dump-state and --dump-memory require --execute".into());
    }

    let code = fs::read(&opt.path)?;
    let mut printer = TermPrinter::new(StandardStream::stdout(ColorChoice::Auto));

    // header that makes the listing feed straight back into an assembler
    printer.print_symbols("bits 16\n\n");

    if opt.execute {
        execute(&opt, code, &mut printer)
    } else {
        disassemble(&code, &mut printer)
    }
}

/// Lists the whole image as assembly, one instruction per line.
fn disassemble<P: AsmPrinter>(code: &[u8], p: &mut P) -> Result<(), Box<dyn Error>> {
    let mut decoder = Decoder::new(code, 0);
    while !decoder.done() {
        let instr = decoder.decode_next()?;
        disasm::print_instr(&instr, p);
        if instr.op.is_prefix() && !decoder.done() {
            // keep rep/lock glued to the instruction they prefix
            p.print_symbols(" ");
        } else {
            p.print_symbols("\n");
        }
    }
    Ok(())
}

/// Runs the image, tracing each step, and reports the final state.
fn execute<P: AsmPrinter>(opt: &Opt, code: Vec<u8>, p: &mut P) -> Result<(), Box<dyn Error>> {
    let mut interpreter = Interpreter::new(code);

    while !interpreter.done() {
        let step = interpreter.step()?;
        disasm::print_trace(&step.instr, &step.before, &step.after, p);
        p.print_symbols("\n");
    }

    print_final_state(interpreter.state(), p);

    if let Some(path) = &opt.dump_state {
        interpreter.state().dump_state(&mut File::create(path)?)?;
    }
    if let Some(path) = &opt.dump_memory {
        interpreter.state().dump_memory(&mut File::create(path)?)?;
    }

    Ok(())
}

/// Prints the end-of-run machine state as listing comments, so the trace
/// output still assembles.
fn print_final_state<P: AsmPrinter>(state: &State, p: &mut P) {
    p.print_symbols("\n");

    let mut line = |text: String| {
        p.print_comment(&text);
        p.print_symbols("\n");
    };

    line("; final state:".to_string());
    for reg in &Register::ALL {
        let value = state.get(reg.word());
        if value != 0 {
            line(format!(";   {}: {:#06x} ({})", reg.word().name(), value, value));
        }
    }
    line(format!(";   ip: {:#06x} ({})", state.ip(), state.ip()));
    let letters = state.flags().letters();
    if !letters.is_empty() {
        line(format!(";   flags: {}", letters));
    }
    line(format!(";   clocks: {}", state.clocks()));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(bytes: &[u8]) -> String {
        let mut out = String::new();
        disassemble(bytes, &mut out).unwrap();
        out
    }

    #[test]
    fn prefixes_share_a_line_with_their_instruction() {
        assert_eq!(listing(&[0xF3, 0xA4]), "rep movsb\n");
        assert_eq!(listing(&[0xF3, 0xA4, 0x90]), "rep movsb\nxchg ax, ax\n");
    }

    #[test]
    fn trailing_prefix_still_ends_the_line() {
        assert_eq!(listing(&[0xF3]), "rep\n");
        assert_eq!(listing(&[0x90, 0xF0]), "xchg ax, ax\nlock\n");
    }
}

fn main() {
    // By default, log all `info!` messages and higher
    env_logger::Builder::from_default_env()
        .filter(None, log::LevelFilter::Info)
        .init();

    match run() {
        Ok(()) => {}
        Err(e) => {
            eprintln!("exiting due to error: {}", e);
            process::exit(1);
        }
    }
}
