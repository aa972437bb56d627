use std::fs::File;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::{fmt, io, net};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use native_tls::{Certificate, TlsConnector};

use common::err::schema_error::SchemaError;
use common::err::SResult;

use crate::conn::connection_options::ConnectionOptions;
use crate::{MAX_BODY_LENGTH, TIMEOUT_LATENCY_DELTA};

#[derive(Debug)]
pub struct PacketChannel {
    stream: ChannelStream,
}

impl PacketChannel {
    pub fn new(options: &ConnectionOptions) -> SResult<Self> {
        let address: String = format!("{}:{}", options.hostname, options.port);
        let stream = TcpStream::connect(address)?;
        let read_timeout = options.read_timeout + TIMEOUT_LATENCY_DELTA;
        stream.set_read_timeout(Some(read_timeout))?;
        Ok(Self {
            stream: ChannelStream::Tcp(stream),
        })
    }

    pub fn is_ssl(&self) -> bool {
        match self.stream {
            ChannelStream::Tls(_) => true,
            _ => false,
        }
    }

    /// 读取一个完整的逻辑包。 body 为 0xffffff 时后面跟续包, 需要拼接
    pub fn read_packet(&mut self) -> SResult<(Vec<u8>, u8)> {
        let (mut packet, mut seq_num) = self.read_frame()?;

        let mut last_len = packet.len();
        while last_len == MAX_BODY_LENGTH {
            let (next, next_seq) = self.read_frame()?;
            last_len = next.len();
            seq_num = next_seq;
            packet.extend_from_slice(&next);
        }

        Ok((packet, seq_num))
    }

    fn read_frame(&mut self) -> SResult<(Vec<u8>, u8)> {
        let mut header_buffer = [0; crate::PACKET_HEADER_SIZE];

        self.stream.read_exact(&mut header_buffer)?;
        let packet_size = (&header_buffer[0..3]).read_u24::<LittleEndian>()?;
        let seq_num = header_buffer[3];

        let mut packet: Vec<u8> = vec![0; packet_size as usize];
        self.stream.read_exact(&mut packet)?;

        Ok((packet, seq_num))
    }

    /// 写出一个逻辑包。 超过 0xffffff 时拆分为多个物理包, 返回最后使用的 seq
    pub fn write_packet(&mut self, packet: &[u8], seq_num: u8) -> SResult<u8> {
        let mut seq_num = seq_num;

        if packet.is_empty() {
            self.write_frame(&[], seq_num)?;
            return Ok(seq_num);
        }

        let mut offset = 0;
        while offset < packet.len() {
            let end = std::cmp::min(offset + MAX_BODY_LENGTH, packet.len());
            self.write_frame(&packet[offset..end], seq_num)?;
            offset = end;
            if offset < packet.len() {
                seq_num = seq_num.wrapping_add(1);
            }
        }

        // body 恰好为 0xffffff 的倍数时必须补一个空包收尾
        if packet.len() % MAX_BODY_LENGTH == 0 {
            seq_num = seq_num.wrapping_add(1);
            self.write_frame(&[], seq_num)?;
        }

        Ok(seq_num)
    }

    fn write_frame(&mut self, body: &[u8], seq_num: u8) -> SResult<()> {
        self.stream.write_u24::<LittleEndian>(body.len() as u32)?;
        self.stream.write_u8(seq_num)?;
        self.stream.write_all(body)?;
        self.stream.flush()?;
        Ok(())
    }

    pub fn shutdown(&mut self) -> SResult<()> {
        Ok(self.stream.shutdown()?)
    }

    pub fn upgrade_to_ssl(self, options: &ConnectionOptions) -> SResult<Self> {
        if options.ssl_opts.is_none() {
            return Err(SchemaError::ConnectionError(
                "The ssl options is empty.".to_string(),
            ));
        }
        let ssl_opts = options.ssl_opts.clone().unwrap();

        let domain = options.hostname.clone();

        let mut builder = TlsConnector::builder();
        if let Some(root_cert_path) = ssl_opts.root_cert_path() {
            let mut root_cert_data = vec![];
            let mut root_cert_file = File::open(root_cert_path)?;
            root_cert_file.read_to_end(&mut root_cert_data)?;

            let root_certs = match Certificate::from_der(&root_cert_data)
                .map(|x| vec![x])
                .or_else(|_| {
                    pem::parse_many(&*root_cert_data)
                        .unwrap_or_default()
                        .iter()
                        .map(pem::encode)
                        .map(|s| Certificate::from_pem(s.as_bytes()))
                        .collect()
                }) {
                Ok(cert) => cert,
                Err(err) => {
                    return Err(SchemaError::ConnectionError(format!(
                        "The ssl cert can not load. err:{{{err}}}"
                    )))
                }
            };

            for root_cert in root_certs {
                builder.add_root_certificate(root_cert);
            }
        }
        if let Some(client_identity) = ssl_opts.client_identity() {
            let identity = client_identity.load()?;
            builder.identity(identity);
        }
        builder.danger_accept_invalid_hostnames(ssl_opts.skip_domain_validation());
        builder.danger_accept_invalid_certs(ssl_opts.accept_invalid_certs());
        let tls_connector = match builder.build() {
            Ok(tls) => tls,
            Err(err) => {
                return Err(SchemaError::ConnectionError(format!(
                    "Can not build tls. err:{{{err}}}"
                )))
            }
        };

        match self.stream {
            ChannelStream::Tcp(tcp_stream) => {
                let secure_stream = match tls_connector.connect(&domain, tcp_stream) {
                    Ok(stream) => stream,
                    Err(err) => {
                        return Err(SchemaError::ConnectionError(format!(
                            "Can not connect tls. err:{{{err}}}"
                        )))
                    }
                };
                Ok(Self {
                    stream: ChannelStream::Tls(secure_stream),
                })
            }
            ChannelStream::Tls(_) => Ok(self),
        }
    }
}

enum ChannelStream {
    Tls(native_tls::TlsStream<net::TcpStream>),
    Tcp(net::TcpStream),
}

impl ChannelStream {
    pub fn shutdown(&mut self) -> io::Result<()> {
        match self {
            ChannelStream::Tcp(stream) => stream.shutdown(net::Shutdown::Both),
            ChannelStream::Tls(stream) => stream.shutdown(),
        }
    }
}

impl Write for ChannelStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            ChannelStream::Tcp(stream) => stream.write(buf),
            ChannelStream::Tls(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            ChannelStream::Tcp(stream) => stream.flush(),
            ChannelStream::Tls(stream) => stream.flush(),
        }
    }
}

impl Read for ChannelStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            ChannelStream::Tcp(stream) => stream.read(buf),
            ChannelStream::Tls(stream) => stream.read(buf),
        }
    }
}

impl fmt::Debug for ChannelStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ChannelStream::Tcp(ref s) => write!(f, "Tcp stream {:?}", s),
            ChannelStream::Tls(ref s) => write!(f, "Tls stream {:?}", s),
        }
    }
}
