use std::io;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use crate::icmp::{self, IcmpMessage};
use crate::ipv4::Ipv4Header;

/// Tempo máximo de espera por uma resposta antes de declarar timeout.
pub const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

/// Espaçamento mínimo entre envios consecutivos.
pub const SEND_INTERVAL: Duration = Duration::from_secs(1);

/// Timeouts consecutivos tolerados antes de desistir do destino.
pub const DEFAULT_RETRY_BUDGET: u32 = 4;

// Maior datagrama que aceitamos receber de uma vez
const MAX_DATAGRAM: usize = 2048;

/// Família de protocolo da sessão, com as constantes que mudam entre elas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolFamily {
    V4,
    V6,
}

impl ProtocolFamily {
    /// Tipo ICMP do Echo Request desta família.
    pub fn echo_request_type(self) -> u8 {
        match self {
            ProtocolFamily::V4 => icmp::ECHO_REQUEST,
            ProtocolFamily::V6 => icmp::ECHO_REQUEST_V6,
        }
    }

    /// Tipo ICMP do Echo Reply desta família.
    pub fn echo_reply_type(self) -> u8 {
        match self {
            ProtocolFamily::V4 => icmp::ECHO_REPLY,
            ProtocolFamily::V6 => icmp::ECHO_REPLY_V6,
        }
    }

    /// Se o datagrama recebido vem precedido do cabeçalho IP.
    ///
    /// Em sockets raw ICMPv4 o kernel entrega o cabeçalho IPv4 junto; em
    /// raw ICMPv6 ele consome o cabeçalho e entrega só a mensagem ICMP.
    pub fn includes_ip_header(self) -> bool {
        match self {
            ProtocolFamily::V4 => true,
            ProtocolFamily::V6 => false,
        }
    }
}

/// Transmissão e recepção de datagramas, abstraídas para permitir testes
/// sem socket de verdade (e sem privilégios).
pub trait Transport {
    fn send(&mut self, packet: &[u8]) -> io::Result<usize>;

    /// Tenta receber um datagrama sem bloquear; `Ok(None)` quando não há nada.
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<Option<usize>>;
}

/// Fonte de tempo injetável, pelo mesmo motivo do [`Transport`].
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Relógio de verdade, usado fora dos testes.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Estado observável da sessão.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Nenhum pedido transmitido ainda.
    Idle,
    /// Pedido no ar, timer de timeout armado.
    AwaitingReply,
    /// Pedido atual resolvido; próximo envio agendado no timer.
    WaitingNextSend,
    /// Orçamento de retransmissões esgotado; a sessão parou de enviar.
    Failed,
}

// O único slot de timer da sessão: ou o timeout de resposta, ou o
// agendamento do próximo envio, nunca os dois. Armar um substitui o outro,
// e desarmar é idempotente (um deadline sem slot armado não faz nada).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    ReplyTimeout,
    NextSend,
}

/// O que aconteceu em um `poll`, para a camada de saída imprimir.
#[derive(Debug)]
pub enum Event {
    /// Echo Reply casou com o pedido pendente.
    Reply {
        /// Bytes da mensagem ICMP (v4: datagrama menos o cabeçalho IP).
        bytes: usize,
        /// Endereço de origem, disponível só no v4 (vem do cabeçalho IP).
        source: Option<IpAddr>,
        sequence: u16,
        /// TTL do cabeçalho IPv4; `None` no v6.
        ttl: Option<u8>,
        rtt: Duration,
    },
    /// O timeout de 5 segundos estourou sem resposta para este pedido.
    TimedOut { sequence: u16 },
    /// Falha ao transmitir; consome orçamento como um timeout.
    SendFailed { sequence: u16, error: io::Error },
    /// Erro de leitura no socket (a sessão continua recebendo).
    ReceiveFailed { error: io::Error },
}

/// Sessão de echo para um único destino.
///
/// Máquina de estados dirigida por `poll`: constrói o Echo Request,
/// transmite, arma o timeout, recebe e filtra datagramas, mede o RTT e
/// decide quando retransmitir. Um laço cooperativo de uma thread só chama
/// `start` uma vez e depois `poll` até a sessão falhar ou o chamador parar.
pub struct EchoSession<T: Transport, C: Clock> {
    family: ProtocolFamily,
    transport: T,
    clock: C,
    identifier: u16,
    payload: Vec<u8>,
    state: State,
    timer: Option<(TimerKind, Instant)>,
    sequence: u16,
    time_sent: Instant,
    // Respostas casadas com o pedido atual (duplicatas contam aqui)
    replies_for_current: u32,
    replies_received: u64,
    requests_sent: u64,
    retry_budget: u32,
}

impl<T: Transport, C: Clock> EchoSession<T, C> {
    /// Cria a sessão. O identificador vem de quem chama (tipicamente o PID),
    /// para que vários pingers no mesmo host não confundam as respostas.
    pub fn new(
        family: ProtocolFamily,
        transport: T,
        clock: C,
        identifier: u16,
        payload: Vec<u8>,
    ) -> Self {
        let now = clock.now();
        EchoSession {
            family,
            transport,
            clock,
            identifier,
            payload,
            state: State::Idle,
            timer: None,
            sequence: 0,
            time_sent: now,
            replies_for_current: 0,
            replies_received: 0,
            requests_sent: 0,
            retry_budget: DEFAULT_RETRY_BUDGET,
        }
    }

    /// Transmite o primeiro pedido; os seguintes são agendados pelo timer.
    pub fn start(&mut self) -> Option<Event> {
        let now = self.clock.now();
        self.send_request(now)
    }

    /// Um passo do laço de eventos: primeiro o timer armado, depois uma
    /// tentativa de recepção. A recepção fica sempre armada, mesmo com o
    /// próximo envio ainda agendado, para não perder respostas atrasadas.
    pub fn poll(&mut self) -> Option<Event> {
        if self.state == State::Failed {
            return None;
        }
        let now = self.clock.now();
        if let Some(event) = self.check_timer(now) {
            return Some(event);
        }
        let mut buffer = [0u8; MAX_DATAGRAM];
        match self.transport.recv(&mut buffer) {
            Ok(Some(n)) => self.on_datagram(&buffer[..n], now),
            Ok(None) => None,
            Err(error) => Some(Event::ReceiveFailed { error }),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn failed(&self) -> bool {
        self.state == State::Failed
    }

    pub fn requests_sent(&self) -> u64 {
        self.requests_sent
    }

    pub fn replies_received(&self) -> u64 {
        self.replies_received
    }

    fn send_request(&mut self, now: Instant) -> Option<Event> {
        self.sequence = self.sequence.wrapping_add(1);
        let request = IcmpMessage::echo_request(
            self.family.echo_request_type(),
            self.identifier,
            self.sequence,
            &self.payload,
        );
        self.requests_sent += 1;
        self.replies_for_current = 0;
        self.time_sent = now;
        match self.transport.send(&request.encode()) {
            Ok(_) => {
                self.timer = Some((TimerKind::ReplyTimeout, now + REPLY_TIMEOUT));
                self.state = State::AwaitingReply;
                None
            }
            Err(error) => {
                // Falha de envio consome orçamento como um timeout; a
                // retransmissão respeita o espaçamento de 1 segundo
                let sequence = self.sequence;
                self.consume_retry();
                Some(Event::SendFailed { sequence, error })
            }
        }
    }

    fn check_timer(&mut self, now: Instant) -> Option<Event> {
        let (kind, deadline) = self.timer?;
        if now < deadline {
            return None;
        }
        self.timer = None;
        match kind {
            TimerKind::ReplyTimeout => {
                // Um casamento teria desarmado este timer; zero respostas
                let sequence = self.sequence;
                self.consume_retry();
                Some(Event::TimedOut { sequence })
            }
            TimerKind::NextSend => self.send_request(now),
        }
    }

    // Gasta uma retransmissão, ou falha de vez se não sobrou nenhuma.
    // Com o orçamento padrão de 4, são 5 transmissões no total.
    fn consume_retry(&mut self) {
        if self.retry_budget == 0 {
            self.state = State::Failed;
        } else {
            self.retry_budget -= 1;
            // Nunca antes de time_sent + 1s, por mais cedo que o timeout
            // tenha estourado
            self.timer = Some((TimerKind::NextSend, self.time_sent + SEND_INTERVAL));
            self.state = State::WaitingNextSend;
        }
    }

    fn on_datagram(&mut self, data: &[u8], now: Instant) -> Option<Event> {
        // Cadeia de decodificação da família; qualquer erro descarta o
        // datagrama em silêncio e a recepção continua
        let (message, bytes, source, ttl) = if self.family.includes_ip_header() {
            let header = Ipv4Header::decode(data).ok()?;
            let message = IcmpMessage::decode(&data[header.header_length()..]).ok()?;
            (
                message,
                data.len() - header.header_length(),
                Some(IpAddr::V4(header.source_address)),
                Some(header.time_to_live),
            )
        } else {
            // Sem cabeçalho IP no v6: o datagrama já é a mensagem ICMP
            (IcmpMessage::decode(data).ok()?, data.len(), None, None)
        };

        // Recebemos todo ICMP que chega ao host; só interessa o echo reply
        // com o nosso identificador e a sequência do pedido pendente
        if message.msg_type != self.family.echo_reply_type()
            || message.identifier != self.identifier
            || message.sequence_number != self.sequence
        {
            return None;
        }

        self.replies_for_current += 1;
        self.replies_received += 1;
        if self.replies_for_current > 1 {
            // Duplicata: registrada, mas sem mexer em timer nem estado
            return None;
        }

        // Primeira resposta deste pedido: interrompe o timeout de 5 segundos
        // (se ainda armado) e agenda o próximo envio mantendo a cadência de
        // um pedido por segundo
        if matches!(self.timer, Some((TimerKind::ReplyTimeout, _))) {
            self.timer = Some((TimerKind::NextSend, self.time_sent + SEND_INTERVAL));
        }
        self.state = State::WaitingNextSend;
        // Pedido novo ganha orçamento de retransmissão cheio
        self.retry_budget = DEFAULT_RETRY_BUDGET;

        Some(Event::Reply {
            bytes,
            source,
            sequence: message.sequence_number,
            ttl,
            rtt: now - self.time_sent,
        })
    }
}
