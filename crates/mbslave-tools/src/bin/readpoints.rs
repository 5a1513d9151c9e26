use clap::{Parser, ValueEnum};
use mbslave_tools::common::{connect_master, init_tracing, ConnectionArgs};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    Coils,
    Discrete,
    Holding,
    Input,
}

#[derive(Debug, Parser)]
#[command(name = "readpoints", about = "Read a range of points from a Modbus TCP slave")]
struct Args {
    #[command(flatten)]
    conn: ConnectionArgs,
    #[arg(long, default_value_t = 1)]
    unit_id: u8,
    #[arg(long, value_enum, default_value_t = Kind::Holding)]
    kind: Kind,
    #[arg(long)]
    start: u16,
    #[arg(long, default_value_t = 1)]
    quantity: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();
    let mut master = connect_master(&args.conn).await?;

    match args.kind {
        Kind::Coils => {
            let values = master
                .read_coils(args.unit_id, args.start, args.quantity)
                .await?;
            for (idx, value) in values.iter().enumerate() {
                println!("addr={} value={}", args.start + idx as u16, u8::from(*value));
            }
        }
        Kind::Discrete => {
            let values = master
                .read_discrete_inputs(args.unit_id, args.start, args.quantity)
                .await?;
            for (idx, value) in values.iter().enumerate() {
                println!("addr={} value={}", args.start + idx as u16, u8::from(*value));
            }
        }
        Kind::Holding => {
            let values = master
                .read_holding_registers(args.unit_id, args.start, args.quantity)
                .await?;
            for (idx, value) in values.iter().enumerate() {
                println!(
                    "addr={} value={} (0x{:04X})",
                    args.start + idx as u16,
                    value,
                    value
                );
            }
        }
        Kind::Input => {
            let values = master
                .read_input_registers(args.unit_id, args.start, args.quantity)
                .await?;
            for (idx, value) in values.iter().enumerate() {
                println!(
                    "addr={} value={} (0x{:04X})",
                    args.start + idx as u16,
                    value,
                    value
                );
            }
        }
    }
    Ok(())
}
