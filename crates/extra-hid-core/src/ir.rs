/// Transmits one frame to the console. Fire-and-forget.
pub type SendFunc = Box<dyn FnMut(&[u8]) + Send>;

/// A device attached to the IR port.
pub trait IrDevice {
    /// Called when the console establishes the connection.
    fn connect(&mut self);

    /// Called when the connection is torn down. Must stop any periodic
    /// activity; calling it while already disconnected is harmless.
    fn disconnect(&mut self);

    /// Deliver one decoded request frame.
    fn receive(&mut self, data: &[u8]);
}
