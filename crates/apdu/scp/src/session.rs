//! Security domain session
//!
//! The session owns the transport and drives the handshake, then protects
//! every command sent through it. Any transport, protocol or cryptographic
//! failure closes the session for good.

use std::fmt;

use bytes::BytesMut;
use derive_more::Display;
use openscp_apdu_core::{Apdu, CardTransport, Response};
use p256::SecretKey;
use tracing::{debug, info, warn};

use crate::{
    Error, ProtocolError, Result,
    certificate::CertificateChain,
    commands::{GetCertificatesCommand, GetResponseCommand},
    config::SessionConfig,
    keys::{KeyRef, Scp03Params, Scp11Params, Scp11Variant, ScpParams},
    mode::ScpMode,
    scp03::Scp03Handshake,
    scp11::Scp11Handshake,
    secure_channel::SecureChannel,
};

/// Lifecycle state of a session
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Not authenticated yet
    Idle,
    /// A handshake is in progress
    Handshaking,
    /// The secure channel is established
    Authenticated,
    /// The session ended, by request or after a fatal error
    Closed,
}

/// Session with a GlobalPlatform security domain
pub struct SecurityDomainSession<T: CardTransport> {
    transport: T,
    config: SessionConfig,
    extended_supported: bool,
    state: SessionState,
    channel: Option<SecureChannel>,
    transport_closed: bool,
}

impl<T: CardTransport> fmt::Debug for SecurityDomainSession<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityDomainSession")
            .field("transport", &self.transport)
            .field("state", &self.state)
            .field("extended_supported", &self.extended_supported)
            .field("mode", &self.mode())
            .finish()
    }
}

impl<T: CardTransport> SecurityDomainSession<T> {
    /// Create a session with the default configuration
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, SessionConfig::default())
    }

    /// Create a session with a custom configuration
    pub fn with_config(transport: T, config: SessionConfig) -> Self {
        let extended_supported = transport.is_extended_length_supported();
        debug!(extended_supported, "opened security domain session");
        Self {
            transport,
            config,
            extended_supported,
            state: SessionState::Idle,
            channel: None,
            transport_closed: false,
        }
    }

    /// Current state
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the secure channel is established
    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated
    }

    /// Mode of the established channel
    pub fn mode(&self) -> Option<ScpMode> {
        self.channel.as_ref().map(SecureChannel::mode)
    }

    /// Session configuration
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Get a reference to the transport
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Get a mutable reference to the transport
    pub const fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Authenticate with SCP03 or SCP11
    ///
    /// Only allowed once, from the `Idle` state.
    pub fn authenticate(&mut self, params: impl Into<ScpParams>, mode: ScpMode) -> Result<()> {
        self.ensure_state(SessionState::Idle, "authenticate")?;
        match params.into() {
            ScpParams::Scp03(params) => {
                let handshake = Scp03Handshake::new(&params, mode);
                self.handshake(|session| session.run_scp03(&handshake))
            }
            ScpParams::Scp11(params) => {
                let handshake = Scp11Handshake::new(&params, mode)?;
                self.handshake(|session| session.run_scp11(&params, &handshake))
            }
        }
    }

    /// Authenticate with SCP03 using a fixed host challenge
    pub fn authenticate_scp03_with_challenge(
        &mut self,
        params: &Scp03Params,
        mode: ScpMode,
        host_challenge: &[u8],
    ) -> Result<()> {
        self.ensure_state(SessionState::Idle, "authenticate")?;
        let handshake = Scp03Handshake::with_host_challenge(params, mode, host_challenge)?;
        self.handshake(|session| session.run_scp03(&handshake))
    }

    /// Authenticate with SCP11 using a fixed OCE ephemeral key
    pub fn authenticate_scp11_with_ephemeral(
        &mut self,
        params: &Scp11Params,
        mode: ScpMode,
        ephemeral: SecretKey,
    ) -> Result<()> {
        self.ensure_state(SessionState::Idle, "authenticate")?;
        let handshake = Scp11Handshake::with_ephemeral_key(params, mode, ephemeral)?;
        self.handshake(|session| session.run_scp11(params, &handshake))
    }

    /// Send a command through the secure channel
    ///
    /// Card status words other than `9000` are returned in the response.
    pub fn send(&mut self, command: &Apdu) -> Result<Response> {
        self.ensure_state(SessionState::Authenticated, "send")?;
        let result = self.send_secure(command);
        self.guard(result)
    }

    /// Read the certificate bundle stored for a security domain key
    ///
    /// Sent in plain before authentication and through the secure channel
    /// after it.
    pub fn get_certificate_bundle(&mut self, key_ref: KeyRef) -> Result<CertificateChain> {
        let command = GetCertificatesCommand::new(key_ref).to_apdu()?;
        let result = match self.state {
            SessionState::Idle => self.transmit_plain(&command),
            SessionState::Authenticated => self.send_secure(&command),
            state => return Err(Error::invalid_state("get_certificate_bundle", state)),
        }
        .and_then(|response| parse_certificate_bundle(&response));
        self.guard(result)
    }

    /// Close the session and wipe the session keys
    ///
    /// Calling it again has no effect.
    pub fn close(&mut self) {
        self.channel = None;
        if self.state != SessionState::Closed {
            info!(state = %self.state, "closing security domain session");
            self.state = SessionState::Closed;
        }
        if !self.transport_closed {
            self.transport.close();
            self.transport_closed = true;
        }
    }

    fn ensure_state(&self, expected: SessionState, operation: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::invalid_state(operation, self.state))
        }
    }

    /// Close the session on fatal errors
    fn guard<R>(&mut self, result: Result<R>) -> Result<R> {
        if let Err(error) = &result
            && error.is_fatal()
        {
            self.abort(error);
        }
        result
    }

    /// Drop the channel after a failure, leaving the transport to `close`
    fn abort(&mut self, error: &Error) {
        warn!(%error, state = %self.state, "closing session after failure");
        self.channel = None;
        self.state = SessionState::Closed;
    }

    fn handshake<F>(&mut self, run: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<SecureChannel>,
    {
        self.state = SessionState::Handshaking;
        match run(self) {
            Ok(channel) => {
                info!(mode = %channel.mode(), "secure channel established");
                self.channel = Some(channel);
                self.state = SessionState::Authenticated;
                Ok(())
            }
            Err(error) => {
                self.abort(&error);
                Err(error)
            }
        }
    }

    fn run_scp03(&mut self, handshake: &Scp03Handshake<'_>) -> Result<SecureChannel> {
        debug!("starting SCP03 handshake");
        let response = self.transmit_plain(&handshake.initialize_update())?;
        if !response.is_success() {
            return Err(Error::unexpected_status("INITIALIZE UPDATE", response.status()));
        }

        let (command, channel) =
            handshake.authenticate_card(response.payload(), self.extended_supported)?;
        let response = self.transmit(&command)?;
        if !response.is_success() {
            return Err(Error::unexpected_status("EXTERNAL AUTHENTICATE", response.status()));
        }
        Ok(channel)
    }

    fn run_scp11(
        &mut self,
        params: &Scp11Params,
        handshake: &Scp11Handshake<'_>,
    ) -> Result<SecureChannel> {
        debug!(variant = %handshake.variant(), "starting SCP11 handshake");
        let sd_public_key = match params.sd_public_key {
            Some(public_key) => public_key,
            None => {
                let response = self.transmit_plain(
                    &GetCertificatesCommand::new(params.sd_key_ref).to_apdu()?,
                )?;
                parse_certificate_bundle(&response)?.security_domain_public_key()?
            }
        };

        for command in handshake.certificate_commands() {
            let response = self.transmit_plain(&command)?;
            if !response.is_success() {
                return Err(Error::unexpected_status(
                    "PERFORM SECURITY OPERATION",
                    response.status(),
                ));
            }
        }

        let command = handshake.key_agreement_command()?;
        let response = self.transmit_plain(&command)?;
        if !response.is_success() {
            let name = match handshake.variant() {
                Scp11Variant::B => "INTERNAL AUTHENTICATE",
                Scp11Variant::A | Scp11Variant::C => "MUTUAL AUTHENTICATE",
            };
            return Err(Error::unexpected_status(name, response.status()));
        }
        handshake.authenticate_card(&command.data, response.payload(), &sd_public_key)
    }

    fn send_secure(&mut self, command: &Apdu) -> Result<Response> {
        let extended_supported = self.extended_supported;
        let wrapped = self
            .channel
            .as_mut()
            .ok_or(Error::invalid_state("send", self.state))?
            .wrap(command, extended_supported)?;

        let response = self.transmit(&wrapped)?;
        self.channel
            .as_mut()
            .ok_or(Error::invalid_state("send", self.state))?
            .unwrap(response)
    }

    /// Send a command that is not protected by the secure channel
    ///
    /// Oversized commands are split with ISO command chaining when the
    /// transport lacks extended length and chaining is enabled.
    fn transmit_plain(&mut self, command: &Apdu) -> Result<Response> {
        if !command.needs_extended_length()
            || self.extended_supported
            || !self.config.command_chaining
        {
            return self.transmit(command);
        }

        let mut blocks = command.split_chained();
        let Some(last) = blocks.pop() else {
            return self.transmit(command);
        };
        debug!(blocks = blocks.len() + 1, "chaining {}", command);
        for block in &blocks {
            let response = self.transmit(block)?;
            if !response.is_success() {
                warn!(status = %response.status(), "card rejected a chained block");
                return Err(ProtocolError::ChainingInterrupted(response.status()).into());
            }
        }
        self.transmit(&last)
    }

    /// Exchange one command, collecting `61xx` continuations
    fn transmit(&mut self, command: &Apdu) -> Result<Response> {
        let bytes = command.to_bytes(self.extended_supported)?;
        let mut response = self.exchange(&bytes)?;
        if !response.status().is_more_data_available() {
            return Ok(response);
        }

        let mut payload = BytesMut::from(response.payload());
        let mut rounds = 0;
        while response.status().is_more_data_available() {
            if rounds == self.config.max_get_response {
                warn!(rounds, "GET RESPONSE limit reached");
                return Err(ProtocolError::GetResponseLimit.into());
            }
            rounds += 1;

            let get_response = GetResponseCommand::for_status(response.status())
                .to_apdu()
                .to_bytes(false)?;
            response = self.exchange(&get_response)?;
            payload.extend_from_slice(response.payload());
        }
        debug!(rounds, len = payload.len(), "reassembled response");
        Ok(Response::new(payload.freeze(), response.status()))
    }

    fn exchange(&mut self, command: &[u8]) -> Result<Response> {
        let raw = self
            .transport
            .transmit_raw(command)
            .map_err(|error| Error::Transport(error.into()))?;
        Response::from_bytes(&raw).map_err(|error| Error::Protocol(error.into()))
    }
}

fn parse_certificate_bundle(response: &Response) -> Result<CertificateChain> {
    if !response.is_success() {
        return Err(Error::unexpected_status("GET DATA", response.status()));
    }
    CertificateChain::from_bundle(response.payload())
}
