use esp_hal::gpio::Input;
use wifitherm_core::provisioning::ProvisioningTrigger;

/// Push button with a pull-up; holding it low forces provisioning.
pub struct ButtonTrigger<'a> {
    input: Input<'a>,
}

impl<'a> ButtonTrigger<'a> {
    pub fn new(input: Input<'a>) -> Self {
        Self { input }
    }
}

impl ProvisioningTrigger for ButtonTrigger<'_> {
    fn is_asserted(&mut self) -> bool {
        self.input.is_low()
    }
}
