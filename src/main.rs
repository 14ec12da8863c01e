// Tratamento de erros ergonômico
use anyhow::{Context, Result};

// Criação e configuração de sockets de baixo nível
use socket2::{Domain, Protocol, SockAddr, Socket, Type};

// Erros de I/O (timeout, would-block, etc.)
use std::io::{self, Read};

// Endereços e resolução de nomes (caixa-preta via ToSocketAddrs)
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};

use std::time::Duration;

// Módulos locais
mod args;
mod checksum;
mod error;
mod icmp;
mod ipv4;
mod ipv6;
mod session;

use session::{EchoSession, Event, ProtocolFamily, SystemClock, Transport};

// Payload enviado dentro de cada Echo Request
const PAYLOAD: &[u8] = b"ping from pingrs";

/// Socket ICMP raw por trás do [`Transport`] da sessão.
///
/// O timeout curto de leitura faz as vezes de tick do laço cooperativo:
/// a sessão nunca fica presa esperando um datagrama que não vem.
struct RawSocketTransport {
    socket: Socket,
    destination: SockAddr,
}

impl Transport for RawSocketTransport {
    fn send(&mut self, packet: &[u8]) -> io::Result<usize> {
        self.socket.send_to(packet, &self.destination)
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<Option<usize>> {
        match self.socket.read(buf) {
            Ok(n) => Ok(Some(n)),
            Err(e)
                if e.kind() == io::ErrorKind::WouldBlock
                    || e.kind() == io::ErrorKind::TimedOut =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Resolve o destino (nome ou endereço literal) para a família pedida.
fn resolve(destination: &str, family: ProtocolFamily) -> Result<IpAddr> {
    let addrs = (destination, 0u16)
        .to_socket_addrs()
        .context("Falha ao resolver o destino")?;
    addrs
        .map(|sa| sa.ip())
        .find(|ip| match family {
            ProtocolFamily::V4 => ip.is_ipv4(),
            ProtocolFamily::V6 => ip.is_ipv6(),
        })
        .context("O destino não resolve para um endereço da família pedida")
}

/// Abre o socket raw da família, em modo "IP raw".
fn open_socket(family: ProtocolFamily) -> Result<Socket> {
    let (domain, protocol) = match family {
        ProtocolFamily::V4 => (Domain::IPV4, Protocol::ICMPV4),
        ProtocolFamily::V6 => (Domain::IPV6, Protocol::ICMPV6),
    };
    let socket = Socket::new(domain, Type::RAW, Some(protocol))
        .context("Falha ao criar socket RAW. Verifique se está rodando como root/Administrador.")?;

    // Tick do laço de eventos: leituras curtas, nunca bloqueio longo
    socket.set_read_timeout(Some(Duration::from_millis(100)))?;

    Ok(socket)
}

/// Imprime um evento da sessão e atualiza os contadores do laço.
fn report(event: &Event, rtts: &mut Vec<f64>, completed: &mut u64) {
    match event {
        Event::Reply {
            bytes,
            source,
            sequence,
            ttl,
            rtt,
        } => {
            let rtt_ms = rtt.as_secs_f64() * 1000.0;
            match (source, ttl) {
                (Some(addr), Some(ttl)) => println!(
                    "Resposta de {}: bytes={} icmp_seq={} ttl={} tempo={:.2}ms",
                    addr, bytes, sequence, ttl, rtt_ms
                ),
                // v6: sem cabeçalho IP no datagrama, sem origem nem hop limit
                _ => println!("Resposta: icmp_seq={} tempo={:.2}ms", sequence, rtt_ms),
            }
            rtts.push(rtt_ms);
            *completed += 1;
        }
        Event::TimedOut { .. } => {
            println!("Esgotado o tempo limite do pedido.");
            *completed += 1;
        }
        Event::SendFailed { error, .. } => {
            println!("Falha ao enviar: {}", error);
            *completed += 1;
        }
        Event::ReceiveFailed { error } => {
            println!("Erro na leitura: {}", error);
        }
    }
}

/// Programa principal: dispara Echo Requests e imprime as respostas.
/// Requer privilégios para abrir sockets raw (root no Unix, Administrador
/// no Windows).
fn main() -> Result<()> {
    // Parsing de argumentos via módulo args
    let parsed = args::parse()?;
    let family = if parsed.use_v6 {
        ProtocolFamily::V6
    } else {
        ProtocolFamily::V4
    };

    // Configura handler para Ctrl+C
    let running = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, std::sync::atomic::Ordering::SeqCst);
    })
    .context("Erro ao configurar handler de Ctrl+C")?;

    let dst = resolve(&parsed.destination, family)?;
    let socket = open_socket(family)?;
    let destination: SockAddr = SocketAddr::new(dst, 0).into();

    // Identificador explícito da sessão: usa o PID do processo (comum em
    // pings), para distinguir as nossas respostas das de outros pingers
    let ident: u16 = std::process::id() as u16;

    println!("Disparando {} com {} bytes de dados:", dst, PAYLOAD.len());

    let transport = RawSocketTransport {
        socket,
        destination,
    };
    let mut session = EchoSession::new(family, transport, SystemClock, ident, PAYLOAD.to_vec());

    // Estatísticas
    let mut rtts = Vec::new();
    let mut completed = 0u64;

    if let Some(event) = session.start() {
        report(&event, &mut rtts, &mut completed);
    }

    loop {
        // Verifica se foi interrompido
        if !running.load(std::sync::atomic::Ordering::SeqCst) {
            break;
        }

        // Orçamento de retransmissões esgotado: destino não responde
        if session.failed() {
            println!("Esgotadas as tentativas, desistindo de {}.", dst);
            break;
        }

        // Verifica limite de contagem se houver
        if let Some(limit) = parsed.count {
            if completed >= limit {
                break;
            }
        }

        if let Some(event) = session.poll() {
            report(&event, &mut rtts, &mut completed);
        }
    }

    // Exibe estatísticas ao sair
    let transmitted = session.requests_sent();
    let received = session.replies_received();
    println!("\n--- estatísticas de ping para {} ---", dst);
    let loss = if transmitted > 0 {
        transmitted.saturating_sub(received) as f64 / transmitted as f64 * 100.0
    } else {
        0.0
    };
    println!(
        "{} pacotes transmitidos, {} recebidos, {:.0}% de perda de pacotes",
        transmitted, received, loss
    );

    if !rtts.is_empty() {
        let min = rtts.iter().fold(f64::INFINITY, |a, &b| a.min(b));
        let max = rtts.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        let sum: f64 = rtts.iter().sum();
        let avg = sum / rtts.len() as f64;
        println!("rtt min/avg/max = {:.3}/{:.3}/{:.3} ms", min, avg, max);
    }

    Ok(())
}
