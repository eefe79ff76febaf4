//! Interactive prompt for stepping the controller by hand
//!
//! Reads yes/no answers from any buffered reader and writes prompts to any
//! writer, so the same loop serves stdin/stdout and tests.

use anyhow::{Context, Result};
use std::io::{BufRead, Write};

use crate::simulation::Controller;

/// Question-and-answer driver around a [`Controller`]
pub struct CommandLine<R, W> {
    controller: Controller,
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> CommandLine<R, W> {
    pub fn new(controller: Controller, input: R, output: W) -> Self {
        Self {
            controller,
            input,
            output,
        }
    }

    /// Welcome the user and run cycles for as long as they want to continue
    pub fn start(&mut self) -> Result<()> {
        writeln!(self.output, "Hello and welcome to TrafficController")?;
        if self.ask("Would you like to start")? {
            self.setup()?;
            self.cycle_manual()?;
        }
        writeln!(self.output, "Thanks for using TrafficController, bye!")?;
        Ok(())
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn into_controller(self) -> Controller {
        self.controller
    }

    fn setup(&mut self) -> Result<()> {
        let real_time = self.ask(
            "Would you like to sleep this application in real time to reflect time for \
             traffic to clear the intersection",
        )?;
        self.controller.set_real_time_mode(real_time);
        Ok(())
    }

    fn cycle_manual(&mut self) -> Result<()> {
        const CONTINUE: &str = "Would you like to continue to next cycle or exit";

        self.display_state()?;
        while self.ask(CONTINUE)? {
            self.controller
                .cycle()
                .context("Traffic controller cycle failed")?;
            self.display_state()?;
        }
        Ok(())
    }

    fn display_state(&mut self) -> Result<()> {
        let intersection = self.controller.intersection();
        writeln!(
            self.output,
            "The intersection has {} vehicles with an average waiting time of {:.2}",
            intersection.num_vehicles(),
            intersection.avg_waiting_time()
        )?;
        Ok(())
    }

    /// Ask until the answer is exactly `Y` or `N`. End of input counts as `N`.
    fn ask(&mut self, question: &str) -> Result<bool> {
        writeln!(self.output, "{}? (Y/N)", question)?;
        self.output.flush()?;

        let mut line = String::new();
        loop {
            line.clear();
            let read = self
                .input
                .read_line(&mut line)
                .context("Failed to read answer")?;
            if read == 0 {
                return Ok(false);
            }
            match line.trim_end_matches(['\r', '\n']) {
                "Y" => return Ok(true),
                "N" => return Ok(false),
                _ => writeln!(self.output, "Answer must be either 'Y' or 'N'!")?,
            }
        }
    }
}
