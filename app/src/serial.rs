/// An IRQ driven, transmit only console
///
pub mod uart1 {
    use core::cell::RefCell;
    use core::sync::atomic::{AtomicU32, Ordering};

    use cortex_m::interrupt::{self as cs, Mutex};
    use heapless::spsc::{Consumer, Producer, Queue};

    use crate::interrupt;
    use crate::hal::{
        pac,
        prelude::*,
        serial::{
            Event,
            Serial,
        }
    };
    use stm32f0xx_hal::gpio::{
        gpiob,
        Alternate,
        AF0,
    };

    // Big enough for a status line covering all twelve channels
    const TX_Q_SIZE: usize = 1024;

    type TxPinType = gpiob::PB6<Alternate<AF0>>;
    type RxPinType = gpiob::PB7<Alternate<AF0>>;
    type Port = Serial<pac::USART1, TxPinType, RxPinType>;

    static TX: Mutex<RefCell<Option<Producer<'static, u8, TX_Q_SIZE>>>> = Mutex::new(RefCell::new(None));
    static PORT: Mutex<RefCell<Option<(Port, Consumer<'static, u8, TX_Q_SIZE>)>>> = Mutex::new(RefCell::new(None));
    static DROPPED: AtomicU32 = AtomicU32::new(0);

    pub struct Uart1Tx {}

    impl core::fmt::Write for Uart1Tx {
        fn write_str(&mut self, s: &str) -> Result<(), core::fmt::Error> {
            write_bytes(s.as_bytes());
            Ok(())
        }
    }

    /// Must be called once during application initialization
    pub fn init(serial: Port, irq_prio: u8) {
        let core = unsafe { pac::CorePeripherals::steal() };
        let mut nvic = core.NVIC;

        let queue = match cortex_m::singleton!(: Queue<u8, TX_Q_SIZE> = Queue::new()) {
            Some(q) => q,
            None => return,
        };
        let (tx_q_producer, tx_q_consumer) = queue.split();

        cs::free(|cs| {
            TX.borrow(cs).replace(Some(tx_q_producer));
            PORT.borrow(cs).replace(Some((serial, tx_q_consumer)));
        });

        unsafe {
            nvic.set_priority(pac::Interrupt::USART1, irq_prio);
            pac::NVIC::unmask(pac::Interrupt::USART1);
        }
    }

    /// Queue bytes for transmission. Bytes which don't fit are dropped and counted.
    pub fn write_bytes(bytes: &[u8]) {
        cs::free(|cs| {
            if let Some(producer) = TX.borrow(cs).borrow_mut().as_mut() {
                let mut lost: u32 = 0;
                for b in bytes {
                    if producer.enqueue(*b).is_err() {
                        lost += 1;
                    }
                }
                // thumbv6m has no read-modify-write atomics, only load and store
                if lost != 0 {
                    DROPPED.store(DROPPED.load(Ordering::Relaxed).wrapping_add(lost), Ordering::Relaxed);
                }
            }
            if let Some((serial, _)) = PORT.borrow(cs).borrow_mut().as_mut() {
                serial.listen(Event::Txe);
            }
        });
    }

    /// Number of bytes lost to a full queue since boot
    pub fn dropped() -> u32 {
        DROPPED.load(Ordering::Relaxed)
    }

    pub fn writer() -> Uart1Tx {
        Uart1Tx {}
    }

    #[interrupt]
    fn USART1() {
        cs::free(|cs| {
            let mut port = PORT.borrow(cs).borrow_mut();
            let (serial, tx_q_consumer) = match port.as_mut() {
                Some(p) => p,
                None => return,
            };

            match tx_q_consumer.peek() {
                Some(&b) => {
                    // Only take the byte off the queue once the data register accepted it
                    if serial.write(b).is_ok() {
                        tx_q_consumer.dequeue();
                    }
                },
                None => {
                    // If the Q is empty, mask the TXE interrupt. It must be re-enabled when data is written to the queue
                    serial.unlisten(Event::Txe);
                }
            }
        });
    }
}
