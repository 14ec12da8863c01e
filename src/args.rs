use anyhow::{Context, Result};

pub struct PingArgs {
    pub destination: String,
    pub count: Option<u64>,
    pub use_v6: bool,
}

pub fn parse() -> Result<PingArgs> {
    let args: Vec<String> = std::env::args().collect();
    let mut destination = None;
    let mut count = None;
    let mut use_v6 = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-c" => {
                if i + 1 < args.len() {
                    let c: u64 = args[i + 1].parse().context("Valor inválido para -c")?;
                    count = Some(c);
                    i += 1;
                } else {
                    anyhow::bail!("Faltou o valor para -c");
                }
            }
            "-6" => {
                use_v6 = true;
            }
            val => {
                if destination.is_none() {
                    destination = Some(val.to_string());
                }
            }
        }
        i += 1;
    }

    let destination = destination.context("Uso: pingrs_raw <destino> [-c <count>] [-6]")?;

    Ok(PingArgs {
        destination,
        count,
        use_v6,
    })
}
