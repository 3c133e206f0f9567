//! Implementation of the Java Minecraft ping protocol.
//! [Server List Ping](https://wiki.vg/Server_List_Ping)

use std::{
    io::{self, Read, Write},
    net::{TcpStream, ToSocketAddrs},
    str::FromStr,
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use serde::Deserialize;
use tracing::{debug, trace};

use crate::{
    Chat, Error, Phase, ProtocolError,
    varint::{VarInt, read_var_int, write_var_int},
};

/// The default port of a Java Edition server.
pub const DEFAULT_PORT: u16 = 25565;

/// The protocol version sent in the handshake (1.16.4 / 1.16.5).
///
/// Servers answer status requests regardless of the version a client claims.
pub const PROTOCOL_VERSION: i32 = 754;

/// Largest payload a packet may declare, the biggest three-byte `VarInt`.
const MAX_PACKET_LEN: i32 = 2_097_151;

/// The handshake's `next_state` value selecting the status protocol.
const STATUS_STATE: i32 = 1;

/// Configuration for pinging a Java server.
///
/// # Examples
///
/// ```
/// use jeping::Java;
/// use std::time::Duration;
///
/// let java_config = Java {
///     host: "mc.hypixel.net".to_string(),
///     timeout: Some(Duration::from_secs(10)),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Java {
    /// Host name or IP address to connect to. It is also sent to the server
    /// in the handshake.
    pub host: String,
    pub port: u16,
    /// Bounds the connection attempt, then the rest of the query.
    ///
    /// `None` or a zero duration waits for as long as the operating system
    /// lets a TCP connection hang.
    pub timeout: Option<Duration>,
    /// The protocol version advertised in the handshake.
    pub protocol_version: i32,
}

impl Default for Java {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            timeout: Some(Duration::from_secs(5)),
            protocol_version: PROTOCOL_VERSION,
        }
    }
}

impl Java {
    fn effective_timeout(&self) -> Option<Duration> {
        self.timeout.filter(|timeout| !timeout.is_zero())
    }

    /// Connects and runs one status query, returning the raw status JSON and
    /// the ping/pong round trip time.
    ///
    /// # Errors
    /// If the server cannot be reached or does not follow the protocol.
    pub fn query(&self) -> Result<(String, Duration), Error> {
        let mut stream = connect(&self.host, self.port, self.effective_timeout())?;
        exchange(&mut stream, self)
    }
}

/// The server status reponse
///
/// More information can be found [here](https://wiki.vg/Server_List_Ping).
#[derive(Debug, Clone, Deserialize)]
pub struct JavaResponse {
    /// The version of the server.
    pub version: Version,
    /// Information about online players
    pub players: Players,
    /// The description of the server (MOTD).
    pub description: Chat,
    /// Does this server enforce server signing?
    #[serde(rename = "enforcesSecureChat")]
    pub enforces_secure_chat: Option<bool>,
}

impl FromStr for JavaResponse {
    type Err = serde_json::Error;

    fn from_str(json: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(json)
    }
}

/// Information about the server's version
#[derive(Debug, Clone, Deserialize)]
pub struct Version {
    /// The name of the version the server is running
    ///
    /// In practice this comes in a large variety of different formats.
    pub name: String,
    /// See [Protocol Version Numbers](https://wiki.vg/Protocol_version_numbers)
    pub protocol: i64,
}

/// An online player of the server.
#[derive(Debug, Clone, Deserialize)]
pub struct Player {
    /// The name of the player.
    pub name: String,
    /// The player's UUID
    pub id: String,
}

/// The stats for players on the server.
#[derive(Debug, Clone, Deserialize)]
pub struct Players {
    /// The max amount of players.
    pub max: i64,
    /// The amount of players online.
    pub online: i64,
    /// A preview of which players are online
    ///
    /// In practice servers often don't send this or use it for more advertising
    pub sample: Option<Vec<Player>>,
}

/// The packets of a status exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Handshake {
        version: i32,
        host: String,
        port: u16,
        next_state: i32,
    },
    Request,
    Response {
        response: String,
    },
    Ping {
        payload: u64,
    },
    Pong {
        payload: u64,
    },
}

impl Packet {
    #[must_use]
    pub const fn id(&self) -> i32 {
        match self {
            Self::Handshake { .. } | Self::Request | Self::Response { .. } => 0x00,
            Self::Ping { .. } | Self::Pong { .. } => 0x01,
        }
    }

    /// Writes the packet, prefixed with its length, in a single write.
    ///
    /// # Errors
    /// If a string is too long to be length-prefixed, or the writer fails.
    pub fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> Result<(), ProtocolError> {
        let mut body = Vec::new();
        write_var_int(&mut body, self.id())?;
        match self {
            Self::Handshake {
                version,
                host,
                port,
                next_state,
            } => {
                write_var_int(&mut body, *version)?;
                write_string(&mut body, host)?;
                body.write_u16::<BigEndian>(*port)?;
                write_var_int(&mut body, *next_state)?;
            }
            Self::Request => {}
            Self::Response { response } => write_string(&mut body, response)?,
            Self::Ping { payload } | Self::Pong { payload } => {
                body.write_u64::<BigEndian>(*payload)?;
            }
        }

        let len = VarInt(i32::try_from(body.len())?);
        let mut frame = Vec::with_capacity(len.written_size() + body.len());
        len.encode(&mut frame)?;
        frame.extend_from_slice(&body);
        w.write_all(&frame)?;
        w.flush()?;
        Ok(())
    }

    /// Decodes the payload of a status response into its JSON text.
    ///
    /// The packet ID is not checked.
    ///
    /// # Errors
    /// If the payload is truncated or the JSON is not UTF-8.
    pub fn decode_response(mut payload: &[u8]) -> Result<String, ProtocolError> {
        let id = read_var_int(&mut payload)?;
        if id != 0x00 {
            debug!(id, "status response has an unusual packet ID");
        }
        read_string(&mut payload)
    }

    /// Decodes the payload of a pong into the echoed ping payload.
    ///
    /// # Errors
    /// If the packet ID is not `0x01` or the payload is truncated.
    pub fn decode_pong(mut payload: &[u8]) -> Result<u64, ProtocolError> {
        let id = read_var_int(&mut payload)?;
        if id != 0x01 {
            return Err(ProtocolError::UnexpectedPacketId {
                expected: 0x01,
                found: id,
            });
        }
        Ok(payload.read_u64::<BigEndian>()?)
    }
}

/// Reads one length-prefixed packet and returns its payload.
///
/// # Errors
/// If the declared length is negative or larger than a packet may be, or the
/// stream ends before the whole payload arrived.
pub fn read_frame<R: Read + ?Sized>(r: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let len = read_var_int(r)?;
    if !(0..=MAX_PACKET_LEN).contains(&len) {
        return Err(ProtocolError::InvalidLength(len));
    }
    let mut payload = vec![0; usize::try_from(len)?];
    r.read_exact(&mut payload)?;
    Ok(payload)
}

fn write_string(w: &mut Vec<u8>, s: &str) -> Result<(), ProtocolError> {
    write_var_int(w, i32::try_from(s.len())?)?;
    w.extend_from_slice(s.as_bytes());
    Ok(())
}

fn read_string(r: &mut &[u8]) -> Result<String, ProtocolError> {
    let len = read_var_int(r)?;
    let len = usize::try_from(len).map_err(|_| ProtocolError::InvalidLength(len))?;
    if len > r.len() {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "string runs past the end of the packet",
        )
        .into());
    }
    let (bytes, rest) = r.split_at(len);
    *r = rest;
    Ok(String::from_utf8(bytes.to_vec())?)
}

/// A byte stream a status exchange can run over.
pub trait Transport: Read + Write {
    /// Bounds how long the following reads and writes may block. `None`
    /// blocks indefinitely.
    ///
    /// # Errors
    /// If the timeout cannot be applied.
    fn set_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()>;
}

impl Transport for TcpStream {
    fn set_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.set_read_timeout(timeout)?;
        self.set_write_timeout(timeout)
    }
}

/// Time left until `deadline`, or a timeout error once it has passed.
fn remaining(deadline: Instant) -> io::Result<Duration> {
    let left = deadline.saturating_duration_since(Instant::now());
    if left.is_zero() {
        return Err(io::ErrorKind::TimedOut.into());
    }
    Ok(left)
}

/// Holds every read and write on a transport to one deadline.
///
/// The transport timeout is set to the time left before each call, so a peer
/// sending one byte at a time still cannot outlast the deadline.
struct Bounded<'a, T: ?Sized> {
    inner: &'a mut T,
    deadline: Option<Instant>,
}

impl<T: Transport + ?Sized> Bounded<'_, T> {
    fn arm(&mut self) -> io::Result<()> {
        match self.deadline {
            Some(deadline) => self.inner.set_timeout(Some(remaining(deadline)?)),
            None => Ok(()),
        }
    }
}

impl<T: Transport + ?Sized> Read for Bounded<'_, T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.arm()?;
        self.inner.read(buf)
    }
}

impl<T: Transport + ?Sized> Write for Bounded<'_, T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.arm()?;
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.arm()?;
        self.inner.flush()
    }
}

fn connect(host: &str, port: u16, timeout: Option<Duration>) -> Result<TcpStream, Error> {
    let address = if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    };
    let addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| Error::Connection {
            address: address.clone(),
            source,
        })?;

    // one deadline for every address the host resolves to
    let deadline = timeout.and_then(|timeout| Instant::now().checked_add(timeout));
    let mut last_error = None;
    for addr in addrs {
        trace!(%addr, "connecting");
        let attempt = match deadline {
            Some(deadline) => {
                remaining(deadline).and_then(|left| TcpStream::connect_timeout(&addr, left))
            }
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => {
                stream
                    .set_nodelay(true)
                    .map_err(|source| Error::Connection {
                        address: address.clone(),
                        source,
                    })?;
                debug!(%addr, "connected");
                return Ok(stream);
            }
            Err(e) => {
                debug!(%addr, error = %e, "connection attempt failed");
                last_error = Some(e);
                if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                    break;
                }
            }
        }
    }
    Err(last_error.map_or(Error::InvalidAddress, |source| Error::Connection {
        address,
        source,
    }))
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |since| u64::try_from(since.as_millis()).unwrap_or(u64::MAX))
}

/// Runs the handshake, status and ping/pong exchange over an established
/// stream.
///
/// The host and port in `config` are only sent in the handshake. A configured
/// timeout becomes a deadline for the whole exchange, and any read or write
/// still blocked when it passes fails with [`Error::TimedOut`].
///
/// Returns the status JSON and the time the ping/pong round trip took.
///
/// # Errors
/// If a read or write fails, the deadline passes, or the server's packets are
/// malformed.
pub fn exchange<T: Transport + ?Sized>(
    stream: &mut T,
    config: &Java,
) -> Result<(String, Duration), Error> {
    let deadline = config
        .effective_timeout()
        .and_then(|timeout| Instant::now().checked_add(timeout));
    let mut stream = Bounded {
        inner: stream,
        deadline,
    };

    Packet::Handshake {
        version: config.protocol_version,
        host: config.host.clone(),
        port: config.port,
        next_state: STATUS_STATE,
    }
    .write_to(&mut stream)
    .map_err(|e| Error::during(Phase::Handshake, e))?;

    Packet::Request
        .write_to(&mut stream)
        .map_err(|e| Error::during(Phase::StatusRequest, e))?;

    let response = read_frame(&mut stream)
        .and_then(|payload| Packet::decode_response(&payload))
        .map_err(|e| Error::during(Phase::StatusResponse, e))?;
    debug!(bytes = response.len(), "received status response");

    let sent = now_millis();
    let start = Instant::now();
    Packet::Ping { payload: sent }
        .write_to(&mut stream)
        .map_err(|e| Error::during(Phase::Ping, e))?;

    let echoed = read_frame(&mut stream)
        .and_then(|payload| Packet::decode_pong(&payload))
        .map_err(|e| Error::during(Phase::Pong, e))?;
    let latency = start.elapsed();
    if echoed != sent {
        debug!(sent, echoed, "pong payload does not match the ping");
    }
    debug!(?latency, "received pong");

    Ok((response, latency))
}

/// Runs a status query against `host:port`.
///
/// Returns the raw status JSON and the ping/pong round trip time.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
///
/// let (json, latency) = jeping::query_status("mc.hypixel.net", 25565, Some(Duration::from_secs(5)))?;
/// println!("{json} ({} ms)", latency.as_millis());
/// # Ok::<(), jeping::Error>(())
/// ```
///
/// # Errors
/// If the server cannot be reached or does not follow the protocol.
pub fn query_status(
    host: &str,
    port: u16,
    timeout: Option<Duration>,
) -> Result<(String, Duration), Error> {
    Java {
        host: host.to_owned(),
        port,
        timeout,
        ..Java::default()
    }
    .query()
}

/// Retrieve the status of a Java server.
///
/// Returns `(latency, response)`.
///
/// # Examples
///
/// ```no_run
/// let (latency, response) = jeping::get_status(&jeping::Java {
///     host: "mc.hypixel.net".into(),
///     timeout: None,
///     ..Default::default()
/// })?;
/// println!("{} ({} ms)", response.description, latency.as_millis());
/// # Ok::<(), jeping::Error>(())
/// ```
///
/// # Errors
/// If the server status cannot be recieved or decoded.
pub fn get_status(config: &Java) -> Result<(Duration, JavaResponse), Error> {
    let (json, latency) = config.query()?;
    Ok((latency, json.parse()?))
}

#[cfg(test)]
mod tests {
    use std::{io::Cursor, net::TcpListener, sync::mpsc, thread};

    use super::*;
    use crate::{ErrorKind, Palette};

    const STATUS: &str = r#"{"version":{"name":"1.20.1","protocol":763},"players":{"online":5,"max":20},"description":{"text":"Welcome","color":"gold","extra":[" to the server"]}}"#;

    /// An in-memory server: canned replies in, everything written kept.
    struct Mock {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
        timeouts: Vec<Option<Duration>>,
    }

    impl Mock {
        fn replying(packets: &[Packet]) -> Self {
            let mut input = Vec::new();
            for packet in packets {
                packet.write_to(&mut input).unwrap();
            }
            Self::with_input(input)
        }

        fn with_input(input: Vec<u8>) -> Self {
            Self {
                input: Cursor::new(input),
                output: Vec::new(),
                timeouts: Vec::new(),
            }
        }
    }

    impl Read for Mock {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for Mock {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.output.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Transport for Mock {
        fn set_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
            self.timeouts.push(timeout);
            Ok(())
        }
    }

    fn localhost() -> Java {
        Java {
            host: "localhost".into(),
            ..Java::default()
        }
    }

    fn status_replies() -> Vec<Packet> {
        vec![
            Packet::Response {
                response: STATUS.into(),
            },
            Packet::Pong { payload: 42 },
        ]
    }

    fn encoded(packet: &Packet) -> Vec<u8> {
        let mut buf = Vec::new();
        packet.write_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn handshake_layout() {
        let handshake = Packet::Handshake {
            version: 754,
            host: "localhost".into(),
            port: 25565,
            next_state: 1,
        };
        let mut expected = vec![0x10, 0x00, 0xf2, 0x05, 0x09];
        expected.extend_from_slice(b"localhost");
        expected.extend_from_slice(&[0x63, 0xdd, 0x01]);
        assert_eq!(encoded(&handshake), expected);
    }

    #[test]
    fn request_and_ping_layout() {
        assert_eq!(encoded(&Packet::Request), [0x01, 0x00]);
        assert_eq!(
            encoded(&Packet::Ping {
                payload: 0x0102_0304_0506_0708
            }),
            [0x09, 0x01, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]
        );
    }

    #[test]
    fn full_exchange() {
        let mut mock = Mock::replying(&status_replies());
        let (json, _latency) = exchange(&mut mock, &localhost()).unwrap();
        assert_eq!(json, STATUS);

        let mut sent = encoded(&Packet::Handshake {
            version: PROTOCOL_VERSION,
            host: "localhost".into(),
            port: DEFAULT_PORT,
            next_state: 1,
        });
        sent.extend_from_slice(&[0x01, 0x00]);
        assert_eq!(&mock.output[..sent.len()], sent.as_slice());
        let ping = &mock.output[sent.len()..];
        assert_eq!(ping.len(), 10);
        assert_eq!(&ping[..2], [0x09, 0x01]);

        assert!(!mock.timeouts.is_empty());
        assert!(
            mock.timeouts
                .iter()
                .all(|t| t.is_some_and(|t| t <= Duration::from_secs(5)))
        );
        assert!(mock.timeouts.windows(2).all(|pair| pair[1] <= pair[0]));
    }

    #[test]
    fn zero_timeout_disables_deadline() {
        for timeout in [None, Some(Duration::ZERO)] {
            let mut mock = Mock::replying(&status_replies());
            let config = Java {
                timeout,
                ..localhost()
            };
            exchange(&mut mock, &config).unwrap();
            assert!(mock.timeouts.is_empty());
        }
    }

    #[test]
    fn end_to_end_rendering() {
        let mut mock = Mock::replying(&status_replies());
        let (json, _) = exchange(&mut mock, &localhost()).unwrap();
        let response: JavaResponse = json.parse().unwrap();
        assert_eq!(response.version.name, "1.20.1");
        assert_eq!(response.version.protocol, 763);
        assert_eq!(response.players.online, 5);
        assert_eq!(response.players.max, 20);
        assert!(response.players.sample.is_none());
        assert_eq!(response.description.plain_text(), "Welcome to the server");
        assert_eq!(
            response.description.colored_text(Palette::TrueColor),
            "\x1b[33mWelcome to the server\x1b[0m"
        );
    }

    #[test]
    fn legacy_description() {
        let response: JavaResponse = r#"{"version":{"name":"Paper 1.8.8","protocol":47},"players":{"online":0,"max":100,"sample":[{"name":"Notch","id":"069a79f4-44e9-4726-a5be-fca90e38aaf5"}]},"description":"§aA Minecraft Server"}"#
            .parse()
            .unwrap();
        assert_eq!(
            response.description,
            Chat::Legacy("§aA Minecraft Server".into())
        );
        assert_eq!(response.players.sample.unwrap()[0].name, "Notch");
    }

    #[test]
    fn wrong_pong_id() {
        let mut mock = Mock::replying(&[
            Packet::Response {
                response: STATUS.into(),
            },
            // same layout as a pong, but with packet ID 0
            Packet::Response {
                response: "1234567".into(),
            },
        ]);
        let err = exchange(&mut mock, &localhost()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert!(matches!(
            err,
            Error::Protocol {
                phase: Phase::Pong,
                source: ProtocolError::UnexpectedPacketId {
                    expected: 0x01,
                    found: 0x00
                }
            }
        ));
    }

    #[test]
    fn oversized_frame() {
        let mut input = Vec::new();
        write_var_int(&mut input, MAX_PACKET_LEN + 1).unwrap();
        let err = exchange(&mut Mock::with_input(input), &localhost()).unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol {
                phase: Phase::StatusResponse,
                source: ProtocolError::InvalidLength(_)
            }
        ));

        let mut input = Vec::new();
        write_var_int(&mut input, -1).unwrap();
        let err = exchange(&mut Mock::with_input(input), &localhost()).unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol {
                source: ProtocolError::InvalidLength(-1),
                ..
            }
        ));
    }

    #[test]
    fn truncated_response() {
        let mut input = encoded(&Packet::Response {
            response: STATUS.into(),
        });
        input.truncate(input.len() - 10);
        let err = exchange(&mut Mock::with_input(input), &localhost()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        match err {
            Error::Protocol {
                phase: Phase::StatusResponse,
                source: ProtocolError::Io(e),
            } => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn json_length_past_payload() {
        // packet ID 0, JSON length 100, but only two bytes follow
        let input = vec![0x04, 0x00, 0x64, b'{', b'}'];
        let err = exchange(&mut Mock::with_input(input), &localhost()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn invalid_utf8() {
        let input = vec![0x04, 0x00, 0x02, 0xc3, 0x28];
        let err = exchange(&mut Mock::with_input(input), &localhost()).unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol {
                source: ProtocolError::InvalidUtf8(_),
                ..
            }
        ));
    }

    #[test]
    fn bad_json_is_a_format_error() {
        let err: Error = "{\"version\":".parse::<JavaResponse>().unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    /// Serves one status exchange on a local socket.
    fn serve_once(listener: TcpListener) -> thread::JoinHandle<()> {
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let handshake = read_frame(&mut stream).unwrap();
            assert_eq!(handshake[0], 0x00);
            assert_eq!(read_frame(&mut stream).unwrap(), [0x00]);
            Packet::Response {
                response: STATUS.into(),
            }
            .write_to(&mut stream)
            .unwrap();
            let ping = read_frame(&mut stream).unwrap();
            let payload = Packet::decode_pong(&ping).unwrap();
            Packet::Pong { payload }.write_to(&mut stream).unwrap();
        })
    }

    #[test]
    fn tcp_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = serve_once(listener);

        let (latency, response) = get_status(&Java {
            host: "127.0.0.1".into(),
            port,
            ..Java::default()
        })
        .unwrap();
        server.join().unwrap();

        assert!(latency < Duration::from_secs(5));
        assert_eq!(response.description.plain_text(), "Welcome to the server");
    }

    #[test]
    fn silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let (done, wait) = mpsc::channel::<()>();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            wait.recv().ok();
            drop(stream);
        });

        let start = Instant::now();
        let err = query_status("127.0.0.1", port, Some(Duration::from_millis(200))).unwrap_err();
        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(matches!(err, Error::TimedOut(Phase::StatusResponse)));
        assert_eq!(err.kind(), ErrorKind::Connection);

        done.send(()).unwrap();
        server.join().unwrap();
    }

    #[test]
    fn trickling_server_cannot_outlast_deadline() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let (done, stop) = mpsc::channel::<()>();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            read_frame(&mut stream).unwrap();
            read_frame(&mut stream).unwrap();
            // announce 40 bytes, then send them slowly enough to keep every
            // single read alive
            write_var_int(&mut stream, 40).unwrap();
            for _ in 0..40 {
                if stop.try_recv().is_ok() || stream.write_all(&[b' ']).is_err() {
                    break;
                }
                thread::sleep(Duration::from_millis(150));
            }
        });

        let start = Instant::now();
        let err = query_status("127.0.0.1", port, Some(Duration::from_millis(500))).unwrap_err();
        let elapsed = start.elapsed();
        done.send(()).ok();
        server.join().unwrap();

        assert!(elapsed < Duration::from_secs(2), "took {elapsed:?}");
        assert!(matches!(err, Error::TimedOut(Phase::StatusResponse)));
    }

    #[test]
    fn expired_deadline_is_a_timeout() {
        let past = Instant::now();
        thread::sleep(Duration::from_millis(1));
        assert_eq!(remaining(past).unwrap_err().kind(), io::ErrorKind::TimedOut);

        let future = Instant::now() + Duration::from_secs(60);
        assert!(remaining(future).unwrap() <= Duration::from_secs(60));
    }

    #[test]
    fn refused_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = query_status("127.0.0.1", port, Some(Duration::from_secs(1))).unwrap_err();
        assert!(matches!(err, Error::Connection { .. }));
        assert_eq!(err.kind(), ErrorKind::Connection);
    }

    #[test]
    #[ignore = "needs a network where 10.255.255.1 is unroutable"]
    fn unreachable_host_times_out() {
        let start = Instant::now();
        let err = query_status("10.255.255.1", DEFAULT_PORT, Some(Duration::from_secs(1)))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert!(start.elapsed() < Duration::from_secs(3));
    }
}
