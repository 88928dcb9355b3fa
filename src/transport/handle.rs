use log::debug;

use super::{Exchange, Transport};
use crate::{
    options::{OptionValue, Options, RequiredOptionWarning, TransportOption},
    Result,
};

/// State a request keeps with its transport: the option store and the last
/// finished exchange.
#[derive(Debug, Clone)]
pub(crate) struct Handle {
    options: Options,
    exchange: Option<Exchange>,
    open: bool,
}

impl Default for Handle {
    fn default() -> Self {
        Self {
            options: Options::with_required(),
            exchange: None,
            open: true,
        }
    }
}

impl Handle {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) const fn options(&self) -> &Options {
        &self.options
    }

    pub(crate) fn set(
        &mut self,
        option: TransportOption,
        value: impl Into<OptionValue>,
    ) -> Option<RequiredOptionWarning> {
        self.options.set(option, value)
    }

    pub(crate) fn unset(&mut self, option: TransportOption) -> Option<OptionValue> {
        self.options.remove(option)
    }

    pub(crate) const fn exchange(&self) -> Option<&Exchange> {
        self.exchange.as_ref()
    }

    pub(crate) fn store(&mut self, exchange: Exchange) {
        self.exchange = Some(exchange);
    }

    pub(crate) const fn is_open(&self) -> bool {
        self.open
    }

    /// Release the handle. Only the first call reaches the transport.
    pub(crate) fn close(&mut self, transport: &dyn Transport) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        debug!("Releasing handle for {:?}", self.options.text(TransportOption::Url));
        transport.release(&self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockTransport;

    #[test]
    fn test_close_is_idempotent() {
        let transport = MockTransport::new();
        let mut handle = Handle::new();

        assert!(handle.is_open());
        handle.close(&transport).unwrap();
        handle.close(&transport).unwrap();

        assert!(!handle.is_open());
        assert_eq!(transport.releases(), 1);
    }

    #[test]
    fn test_defaults_enable_required_options() {
        let handle = Handle::new();
        assert!(handle.options().flag(TransportOption::HeaderOut));
        assert!(handle.options().flag(TransportOption::Header));
        assert!(handle.options().flag(TransportOption::ReturnTransfer));
        assert!(handle.exchange().is_none());
    }
}
