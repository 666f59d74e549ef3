use std::fs::File;
use std::io::BufRead;
use crate::error::SimError;

/// Wraps an opened trace file in a line reader suitable for [`crate::trace::TraceReader`]
pub fn get_reader(file: File) -> Result<Box<dyn BufRead>, SimError> {
    // Compatibility on other systems
    #[cfg(not(unix))]
    {
        use std::io::BufReader;
        const BUFFER_SIZE: usize = 16 * 4096;
        Ok(Box::new(BufReader::with_capacity(BUFFER_SIZE, file)))
    }
    // Memory map the file on unix systems, traces are read strictly front to back
    #[cfg(unix)]
    {
        use std::io::Cursor;
        use memmap2::{Advice, Mmap};
        // An empty file can't be mapped
        if file.metadata()?.len() == 0 {
            return Ok(Box::new(std::io::empty()));
        }
        // The map is only read, and traces aren't expected to change while being simulated
        let m = unsafe { Mmap::map(&file)? };
        m.advise(Advice::Sequential)?;
        Ok(Box::new(Cursor::new(m)))
    }
}
