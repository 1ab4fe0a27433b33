use gscribe::{
    ArcRequest, Corner, Direction, EmitterConfig, GCodeError, HaltMode, InstructionTable,
    LengthUnits, Machine, MoveRequest, Orientation, RackMode, SpinMode, WriterSink,
};
use std::sync::Arc;
use tracing::info;

fn main() -> Result<(), GCodeError> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: gscribe <output.gcode> [config.json]");
        eprintln!();
        eprintln!("Writes a small sample program, mostly useful to try a config.");
        std::process::exit(1);
    }

    if let Err(err) = gscribe::init_logging() {
        eprintln!("logging disabled: {}", err);
    }

    let output_path = &args[1];
    let config = match args.get(2) {
        Some(path) => EmitterConfig::from_file(path)?,
        None => EmitterConfig::default().with_header("; gscribe sample").with_footer("; end"),
    };

    let table = Arc::new(InstructionTable::builtin());
    let sink = WriterSink::create_file(output_path)?.with_line_ending(config.line_ending);
    let mut machine = Machine::start(config, table, sink)?;

    machine.select_units(LengthUnits::Millimeters)?;
    machine.tool_change(RackMode::Manual, 1)?;
    machine.tool_on(SpinMode::Clockwise, 12000.0)?;

    let motion = machine.motion_mut();
    motion.feed(600.0)?;
    motion.rapid_absolute(&MoveRequest::xy(5.0, 5.0))?;
    motion.rect(40.0, 20.0, Corner::LowerLeft, Direction::Clockwise)?;
    motion.meander(40.0, 20.0, 2.5, Corner::LowerLeft, Orientation::X)?;
    motion.arc(&ArcRequest::xy(10.0, 0.0).direction(Direction::CounterClockwise))?;

    machine.tool_off()?;
    machine.halt_program(HaltMode::EndWithReset)?;
    machine.finish()?;

    info!("wrote {}", output_path);
    println!("Generated: {}", output_path);

    Ok(())
}
